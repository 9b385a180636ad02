//! Rule store: durable rows of authorization facts.
//!
//! # Purpose
//! Plain CRUD over the `rules` table. Rows are handed out raw so the policy
//! adapter can classify them and report corruption; nothing here interprets
//! rule semantics.
//!
//! # Storage form
//! `rules(id, kind, subject, object, action, effect)`. `kind` is `'p'` or
//! `'g'` for every row this crate writes. Grouping rows leave `action` and
//! `effect` NULL. Rows with a NULL `kind` predate the discriminator and are
//! classified by which columns are populated.
use async_trait::async_trait;
use rulegate_policy::RuleRow;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

/// One stored row, exactly as read from the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredRule {
    pub id: i64,
    pub kind: Option<String>,
    pub subject: Option<String>,
    pub object: Option<String>,
    pub action: Option<String>,
    pub effect: Option<String>,
}

/// Column values written for a rule row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleColumns<'a> {
    pub kind: &'static str,
    pub subject: &'a str,
    pub object: &'a str,
    pub action: Option<&'a str>,
    pub effect: Option<&'a str>,
}

impl<'a> RuleColumns<'a> {
    pub(crate) fn of(row: &'a RuleRow) -> Self {
        match row {
            RuleRow::Permission(rule) => Self {
                kind: row.policy_type().as_str(),
                subject: rule.subject(),
                object: rule.object(),
                action: Some(rule.action()),
                effect: Some(rule.effect().as_str()),
            },
            RuleRow::Grouping(rule) => Self {
                kind: row.policy_type().as_str(),
                subject: rule.member(),
                object: rule.group(),
                action: None,
                effect: None,
            },
        }
    }

    /// Exact-match predicate shared by every backend's delete.
    ///
    /// Legacy rows (NULL `kind`) match when their columns are equal; grouping
    /// rows match only when `action`/`effect` are unset. Effects compare the
    /// way loading parses them: trimmed and case-insensitive.
    pub(crate) fn matches(&self, stored: &StoredRule) -> bool {
        let kind_ok = stored.kind.as_deref().is_none_or(|kind| kind == self.kind);
        let unset = |value: &Option<String>| value.as_deref().is_none_or(str::is_empty);
        kind_ok
            && stored.subject.as_deref() == Some(self.subject)
            && stored.object.as_deref() == Some(self.object)
            && match (self.action, self.effect) {
                (Some(action), Some(effect)) => {
                    stored.action.as_deref() == Some(action)
                        && stored
                            .effect
                            .as_deref()
                            .is_some_and(|stored| stored.trim().eq_ignore_ascii_case(effect))
                }
                _ => unset(&stored.action) && unset(&stored.effect),
            }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Every row, ordered by `id` (insertion order).
    async fn list_rules(&self) -> StoreResult<Vec<StoredRule>>;
    async fn insert_rule(&self, row: &RuleRow) -> StoreResult<()>;
    /// Delete rows equal to `row`; returns the number removed.
    async fn delete_rule(&self, row: &RuleRow) -> StoreResult<u64>;
    /// Replace the whole table with `rows` in a single transaction.
    async fn replace_all(&self, rows: &[RuleRow]) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
