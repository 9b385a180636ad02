//! Rulegate policy primitives shared by the rule store, adapter, and enforcer.
//!
//! # Purpose
//! Centralizes the authorization model (Casbin), the permission and grouping
//! rule shapes, and the textual policy line grammar used between the storage
//! adapter and the in-memory policy model.
//!
//! # How it fits
//! The `rulegate` service persists [`RuleRow`]s in a relational table, turns
//! each stored row into a policy line, and feeds those lines into a
//! [`PolicyModel`] that the enforcer compiles.
//!
//! # Key invariants
//! - Permission lines are `p, subject, object, action, effect`.
//! - Grouping lines are `g, member, group`.
//! - Rule fields are non-empty and never contain the `,` separator.
//!
//! # Examples
//! ```rust
//! use rulegate_policy::{Effect, PermissionRule, PolicyModel};
//!
//! let mut model = PolicyModel::new();
//! model.load_policy_line("p, admins, admin_text, read, allow").unwrap();
//! model.load_policy_line("g, u3, admins").unwrap();
//! assert_eq!(model.permissions()[0].effect(), Effect::Allow);
//! assert_eq!(model.groupings()[0].group(), "admins");
//! let rule = PermissionRule::new("admins", "admin_text", "read", Effect::Allow).unwrap();
//! assert!(model.permissions().contains(&rule));
//! ```
//!
//! # Common pitfalls
//! - Storing values with embedded commas breaks the line grammar; the
//!   constructors reject them.
//! - Treating an unknown effect as allow; effects are a closed set.

mod casbin_model;
mod errors;
mod line;
mod model;
mod principal;
mod rule;

pub use casbin_model::casbin_model_string;
pub use errors::{PolicyError, PolicyResult};
pub use line::{parse_policy_line, parse_policy_lines};
pub use model::PolicyModel;
pub use principal::Principal;
pub use rule::{Effect, GroupingRule, PermissionRule, PolicyType, RuleRow};
