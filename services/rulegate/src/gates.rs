//! Fixed UI gates: named `(object, action)` pairs checked by the front end.
use crate::authorizer::Authorizer;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    AdminText,
    ReportText,
    ClientNameInput,
    TimeSpentInput,
}

impl Gate {
    pub const fn all() -> [Gate; 4] {
        [
            Gate::AdminText,
            Gate::ReportText,
            Gate::ClientNameInput,
            Gate::TimeSpentInput,
        ]
    }

    pub const fn object(self) -> &'static str {
        match self {
            Gate::AdminText => "admin_text",
            Gate::ReportText => "report_text",
            Gate::ClientNameInput => "inputbox_client_name",
            Gate::TimeSpentInput => "inputbox_time_spent",
        }
    }

    pub const fn action(self) -> &'static str {
        match self {
            Gate::AdminText | Gate::ReportText => "read",
            Gate::ClientNameInput | Gate::TimeSpentInput => "write",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Gate::AdminText => "admin text",
            Gate::ReportText => "report text",
            Gate::ClientNameInput => "client name input",
            Gate::TimeSpentInput => "time spent input",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.label(), self.object(), self.action())
    }
}

/// A report can only be submitted when both of its input boxes are writable.
pub fn can_submit_report(authz: &Authorizer, subject: &str) -> bool {
    authz.allows(subject, Gate::ClientNameInput) && authz.allows(subject, Gate::TimeSpentInput)
}
