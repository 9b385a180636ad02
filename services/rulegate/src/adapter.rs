//! Policy adapter: translation between stored rows and the policy model.
//!
//! # Purpose and responsibility
//! Loads every stored row as a policy line into a fresh [`PolicyModel`], and
//! writes single-rule and full-model changes back to the [`RuleStore`].
//!
//! # Key invariants and assumptions
//! - Load order equals store row order.
//! - A row that classifies as neither a permission nor a grouping aborts the
//!   whole load; rows are never skipped.
//! - Every mutation reaches durable storage before it returns.
//!
//! # Capabilities
//! Filtered removal is a separate trait, [`FilteredPolicyAdapter`], so code
//! that only needs load/save/add/remove never depends on it.
use crate::store::{RuleStore, StoreError, StoredRule};
use async_trait::async_trait;
use rulegate_policy::{PolicyError, PolicyModel, PolicyType, RuleRow};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt rule row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] PolicyError),
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

impl AdapterError {
    /// Whether retrying the same call can never succeed.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, AdapterError::Store(_))
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    async fn load_policy(&self) -> AdapterResult<PolicyModel>;
    /// Replace all stored rules with the rules of `model`.
    async fn save_policy(&self, model: &PolicyModel) -> AdapterResult<()>;
    async fn add_policy(&self, section: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;
    /// Returns `false` when no stored row matched.
    async fn remove_policy(&self, section: &str, ptype: &str, rule: &[String])
    -> AdapterResult<bool>;
}

#[async_trait]
pub trait FilteredPolicyAdapter: PolicyAdapter {
    async fn remove_filtered_policy(
        &self,
        section: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<bool>;
}

/// Adapter over any [`RuleStore`] backend.
#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn RuleStore>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PolicyAdapter for StoreAdapter {
    async fn load_policy(&self) -> AdapterResult<PolicyModel> {
        let rows = self.store.list_rules().await?;
        let mut model = PolicyModel::new();
        for stored in &rows {
            let row = classify_row(stored)?;
            let line = row.to_line();
            model
                .load_policy_line(&line)
                .map_err(|err| AdapterError::CorruptRow {
                    id: stored.id,
                    reason: err.to_string(),
                })?;
        }
        tracing::debug!(
            backend = self.store.backend_name(),
            rows = rows.len(),
            permissions = model.permissions().len(),
            groupings = model.groupings().len(),
            "policy loaded"
        );
        Ok(model)
    }

    async fn save_policy(&self, model: &PolicyModel) -> AdapterResult<()> {
        let rows: Vec<RuleRow> = model.rows().collect();
        self.store.replace_all(&rows).await?;
        tracing::info!(
            backend = self.store.backend_name(),
            rules = rows.len(),
            "policy saved"
        );
        Ok(())
    }

    async fn add_policy(&self, section: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        let row = RuleRow::from_assertion(section, ptype, rule)?;
        self.store.insert_rule(&row).await?;
        Ok(())
    }

    async fn remove_policy(
        &self,
        section: &str,
        ptype: &str,
        rule: &[String],
    ) -> AdapterResult<bool> {
        let row = RuleRow::from_assertion(section, ptype, rule)?;
        let removed = self.store.delete_rule(&row).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl FilteredPolicyAdapter for StoreAdapter {
    async fn remove_filtered_policy(
        &self,
        _section: &str,
        _ptype: &str,
        _field_index: usize,
        _field_values: &[String],
    ) -> AdapterResult<bool> {
        Err(AdapterError::Unimplemented("remove_filtered_policy"))
    }
}

/// Classify a stored row by its `kind` column, or by populated columns when
/// `kind` is NULL.
pub fn classify_row(stored: &StoredRule) -> AdapterResult<RuleRow> {
    let corrupt = |reason: String| AdapterError::CorruptRow {
        id: stored.id,
        reason,
    };
    let columns = [
        present(&stored.subject),
        present(&stored.object),
        present(&stored.action),
        present(&stored.effect),
    ];

    let policy_type = match stored.kind.as_deref() {
        Some(kind) => kind
            .parse::<PolicyType>()
            .map_err(|err| corrupt(err.to_string()))?,
        None => match columns {
            [Some(_), Some(_), Some(_), Some(_)] => PolicyType::Permission,
            [Some(_), Some(_), None, None] => PolicyType::Grouping,
            _ => {
                return Err(corrupt(
                    "row is neither a 4-column permission nor a 2-column grouping".to_string(),
                ));
            }
        },
    };

    let fields: Vec<&str> = match policy_type {
        PolicyType::Permission => columns.iter().map(|value| value.unwrap_or("")).collect(),
        PolicyType::Grouping => {
            if columns[2].is_some() || columns[3].is_some() {
                return Err(corrupt(
                    "grouping row has action or effect populated".to_string(),
                ));
            }
            columns[..2].iter().map(|value| value.unwrap_or("")).collect()
        }
    };
    RuleRow::from_fields(policy_type, &fields).map_err(|err| corrupt(err.to_string()))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryRuleStore;
    use rulegate_policy::{Effect, GroupingRule, PermissionRule};

    fn stored(id: i64, kind: Option<&str>, cols: [Option<&str>; 4]) -> StoredRule {
        StoredRule {
            id,
            kind: kind.map(str::to_string),
            subject: cols[0].map(str::to_string),
            object: cols[1].map(str::to_string),
            action: cols[2].map(str::to_string),
            effect: cols[3].map(str::to_string),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn legacy_rows_classify_by_populated_columns() {
        let row = classify_row(&stored(
            1,
            None,
            [Some("alice"), Some("doc1"), Some("read"), Some("allow")],
        ))
        .expect("permission");
        assert_eq!(row.to_line(), "p, alice, doc1, read, allow");

        let row = classify_row(&stored(2, None, [Some("alice"), Some("managers"), None, None]))
            .expect("grouping");
        assert_eq!(row.to_line(), "g, alice, managers");

        let row = classify_row(&stored(
            3,
            None,
            [Some("alice"), Some("managers"), Some(""), Some("")],
        ))
        .expect("grouping with empty strings");
        assert_eq!(row.to_line(), "g, alice, managers");
    }

    #[test]
    fn kind_column_takes_precedence() {
        let row = classify_row(&stored(1, Some("g"), [Some("u3"), Some("admins"), None, None]))
            .expect("grouping");
        assert_eq!(
            row,
            RuleRow::Grouping(GroupingRule::new("u3", "admins").unwrap())
        );

        let err = classify_row(&stored(2, Some("p"), [Some("u3"), Some("admins"), None, None]))
            .unwrap_err();
        assert!(matches!(err, AdapterError::CorruptRow { id: 2, .. }));
    }

    #[test]
    fn unclassifiable_rows_are_corrupt() {
        let cases = [
            stored(1, None, [Some("alice"), Some("doc1"), Some("read"), None]),
            stored(2, None, [Some("alice"), None, None, None]),
            stored(3, None, [None, None, None, None]),
            stored(4, Some("x"), [Some("a"), Some("b"), None, None]),
            stored(5, Some("g"), [Some("a"), Some("b"), Some("read"), None]),
            stored(6, None, [Some("a"), Some("b"), Some("read"), Some("maybe")]),
        ];
        for case in cases {
            let id = case.id;
            match classify_row(&case) {
                Err(AdapterError::CorruptRow { id: got, .. }) => assert_eq!(got, id),
                other => panic!("row {id} should be corrupt, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn load_aborts_on_first_corrupt_row() {
        let store = InMemoryRuleStore::with_records([
            stored(0, None, [Some("admins"), Some("admin_text"), Some("read"), Some("allow")]),
            stored(0, None, [Some("broken"), None, None, None]),
        ])
        .await;
        let adapter = StoreAdapter::new(Arc::new(store));
        let err = adapter.load_policy().await.unwrap_err();
        assert!(matches!(err, AdapterError::CorruptRow { id: 2, .. }));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn add_and_remove_round_trip_through_store() {
        let adapter = StoreAdapter::new(Arc::new(InMemoryRuleStore::new()));
        let rule = strings(&["u3", "admin_text", "read", "allow"]);
        adapter.add_policy("p", "p", &rule).await.expect("add");
        adapter
            .add_policy("g", "g", &strings(&["u3", "admins"]))
            .await
            .expect("add grouping");

        let model = adapter.load_policy().await.expect("load");
        assert_eq!(
            model.permissions(),
            &[PermissionRule::new("u3", "admin_text", "read", Effect::Allow).unwrap()]
        );
        assert_eq!(model.groupings().len(), 1);

        assert!(adapter.remove_policy("p", "p", &rule).await.expect("remove"));
        assert!(!adapter.remove_policy("p", "p", &rule).await.expect("no-op"));
    }

    #[tokio::test]
    async fn add_rejects_bad_assertions_before_touching_store() {
        let store = Arc::new(InMemoryRuleStore::new());
        let adapter = StoreAdapter::new(store.clone());
        let err = adapter
            .add_policy("p", "p", &strings(&["u3", "admin_text", "read"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRule(PolicyError::Arity { .. })));
        assert!(store.list_rules().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn filtered_removal_is_always_rejected() {
        let adapter = StoreAdapter::new(Arc::new(InMemoryRuleStore::new()));
        for values in [vec![], strings(&["u3"]), strings(&["u3", "admin_text"])] {
            let err = adapter
                .remove_filtered_policy("p", "p", 0, &values)
                .await
                .unwrap_err();
            assert!(matches!(err, AdapterError::Unimplemented(_)));
            assert!(err.is_permanent());
        }
    }
}
