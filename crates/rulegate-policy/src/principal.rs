//! Subject identifiers supplied by the sign-in layer.
//!
//! # Purpose
//! Wraps the opaque subject string matched against stored rule subjects.
//!
//! # Key invariants
//! - `Display` and `as_str` return the original value unchanged.
//! - Authenticated users map to `u{user_id}`; the authorization core never
//!   parses this back.
use serde::{Deserialize, Serialize};

/// Subject identifier wrapper.
///
/// # Example
/// ```rust
/// use rulegate_policy::Principal;
///
/// let principal = Principal::from_user_id(3);
/// assert_eq!(principal.as_str(), "u3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal(String);

impl Principal {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Subject for an authenticated user row.
    pub fn from_user_id(user_id: i64) -> Self {
        Self(format!("u{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
