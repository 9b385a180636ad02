//! Permission and grouping rule shapes.
//!
//! # Purpose
//! Defines the two kinds of authorization fact and the tagged [`RuleRow`]
//! that carries either one through storage and the policy line grammar.
//!
//! # Key invariants
//! - Every field is non-empty, has no surrounding whitespace, and contains no
//!   `,`, `\n`, or `\r`.
//! - [`Effect`] is a closed set; unknown effects are rejected, never mapped to
//!   allow.
use crate::{PolicyError, PolicyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome a permission rule grants when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl FromStr for Effect {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("allow") {
            Ok(Effect::Allow)
        } else if trimmed.eq_ignore_ascii_case("deny") {
            Ok(Effect::Deny)
        } else {
            Err(PolicyError::InvalidEffect(value.to_string()))
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy assertion type, matching the `p`/`g` prefixes of the line grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyType {
    Permission,
    Grouping,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Permission => "p",
            PolicyType::Grouping => "g",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            PolicyType::Permission => 4,
            PolicyType::Grouping => 2,
        }
    }
}

impl FromStr for PolicyType {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "p" => Ok(PolicyType::Permission),
            "g" => Ok(PolicyType::Grouping),
            other => Err(PolicyError::UnknownPolicyType(other.to_string())),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants or denies `subject` the right to perform `action` on `object`.
///
/// Fields are only reachable through validating constructors, including
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PermissionFields")]
pub struct PermissionRule {
    subject: String,
    object: String,
    action: String,
    effect: Effect,
}

#[derive(Deserialize)]
struct PermissionFields {
    subject: String,
    object: String,
    action: String,
    effect: Effect,
}

impl TryFrom<PermissionFields> for PermissionRule {
    type Error = PolicyError;

    fn try_from(fields: PermissionFields) -> PolicyResult<Self> {
        Self::new(fields.subject, fields.object, fields.action, fields.effect)
    }
}

impl PermissionRule {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
        effect: Effect,
    ) -> PolicyResult<Self> {
        let rule = Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
            effect,
        };
        validate_field("subject", &rule.subject)?;
        validate_field("object", &rule.object)?;
        validate_field("action", &rule.action)?;
        Ok(rule)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Field values in policy order, as the enforcer consumes them.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.object.clone(),
            self.action.clone(),
            self.effect.as_str().to_string(),
        ]
    }
}

/// Makes `member` inherit every permission granted to `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GroupingFields")]
pub struct GroupingRule {
    member: String,
    group: String,
}

#[derive(Deserialize)]
struct GroupingFields {
    member: String,
    group: String,
}

impl TryFrom<GroupingFields> for GroupingRule {
    type Error = PolicyError;

    fn try_from(fields: GroupingFields) -> PolicyResult<Self> {
        Self::new(fields.member, fields.group)
    }
}

impl GroupingRule {
    pub fn new(member: impl Into<String>, group: impl Into<String>) -> PolicyResult<Self> {
        let rule = Self {
            member: member.into(),
            group: group.into(),
        };
        validate_field("member", &rule.member)?;
        validate_field("group", &rule.group)?;
        Ok(rule)
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn to_fields(&self) -> Vec<String> {
        vec![self.member.clone(), self.group.clone()]
    }
}

/// A single authorization fact, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleRow {
    Permission(PermissionRule),
    Grouping(GroupingRule),
}

impl RuleRow {
    pub fn policy_type(&self) -> PolicyType {
        match self {
            RuleRow::Permission(_) => PolicyType::Permission,
            RuleRow::Grouping(_) => PolicyType::Grouping,
        }
    }

    /// Build a rule from an adapter-style assertion: section, policy type and
    /// positional field values.
    ///
    /// The section must equal the policy type (`p`/`p` or `g`/`g`) and the
    /// number of fields must match the type's arity exactly.
    pub fn from_assertion(section: &str, ptype: &str, fields: &[String]) -> PolicyResult<Self> {
        let policy_type: PolicyType = ptype.parse()?;
        if section != policy_type.as_str() {
            return Err(PolicyError::SectionMismatch {
                section: section.to_string(),
                ptype: ptype.to_string(),
            });
        }
        Self::from_fields(policy_type, fields)
    }

    pub fn from_fields<S: AsRef<str>>(policy_type: PolicyType, fields: &[S]) -> PolicyResult<Self> {
        if fields.len() != policy_type.arity() {
            return Err(PolicyError::Arity {
                ptype: policy_type.as_str(),
                expected: policy_type.arity(),
                actual: fields.len(),
            });
        }
        match policy_type {
            PolicyType::Permission => {
                let effect: Effect = fields[3].as_ref().parse()?;
                Ok(RuleRow::Permission(PermissionRule::new(
                    fields[0].as_ref(),
                    fields[1].as_ref(),
                    fields[2].as_ref(),
                    effect,
                )?))
            }
            PolicyType::Grouping => Ok(RuleRow::Grouping(GroupingRule::new(
                fields[0].as_ref(),
                fields[1].as_ref(),
            )?)),
        }
    }

    /// Render the row in the policy line grammar.
    pub fn to_line(&self) -> String {
        match self {
            RuleRow::Permission(rule) => format!(
                "p, {}, {}, {}, {}",
                rule.subject, rule.object, rule.action, rule.effect
            ),
            RuleRow::Grouping(rule) => format!("g, {}, {}", rule.member, rule.group),
        }
    }
}

impl fmt::Display for RuleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

impl From<PermissionRule> for RuleRow {
    fn from(rule: PermissionRule) -> Self {
        RuleRow::Permission(rule)
    }
}

impl From<GroupingRule> for RuleRow {
    fn from(rule: GroupingRule) -> Self {
        RuleRow::Grouping(rule)
    }
}

fn validate_field(field: &'static str, value: &str) -> PolicyResult<()> {
    if value.is_empty() {
        return Err(PolicyError::EmptyField(field));
    }
    if value.trim() != value || value.contains([',', '\n', '\r']) {
        return Err(PolicyError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
