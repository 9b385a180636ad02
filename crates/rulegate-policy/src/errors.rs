use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("empty {0} field")]
    EmptyField(&'static str),
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("invalid effect: {0}")]
    InvalidEffect(String),
    #[error("unknown policy type: {0}")]
    UnknownPolicyType(String),
    #[error("section {section} does not own policy type {ptype}")]
    SectionMismatch { section: String, ptype: String },
    #[error("{ptype} rule expects {expected} fields, got {actual}")]
    Arity {
        ptype: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("malformed policy line: {0}")]
    MalformedLine(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
