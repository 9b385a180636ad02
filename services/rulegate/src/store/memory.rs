//! In-memory implementation of the rule store.
//!
//! # Purpose
//! Implements [`RuleStore`] over a `Vec` guarded by `tokio::sync::RwLock`.
//! It exists for local development, tests, and as a fallback when no database
//! is configured.
//!
//! # Durability and consistency
//! - **Not durable**: all rows are lost on process restart.
//! - Mutations take the write lock; reads take the read lock. `replace_all`
//!   swaps the whole vector under one lock, matching the SQL backend's
//!   transaction.
//! - Row ids are assigned by this process and increase monotonically.
use super::{RuleColumns, RuleStore, StoreResult, StoredRule};
use async_trait::async_trait;
use rulegate_policy::RuleRow;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    items: Vec<StoredRule>,
}

impl Rows {
    fn push(&mut self, mut row: StoredRule) {
        self.next_id += 1;
        row.id = self.next_id;
        self.items.push(row);
    }
}

/// In-memory rule store. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw rows, bypassing rule validation. Ids are reassigned.
    pub async fn with_records(records: impl IntoIterator<Item = StoredRule>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write().await;
            for record in records {
                rows.push(record);
            }
        }
        store
    }
}

fn to_record(row: &RuleRow) -> StoredRule {
    let columns = RuleColumns::of(row);
    StoredRule {
        id: 0,
        kind: Some(columns.kind.to_string()),
        subject: Some(columns.subject.to_string()),
        object: Some(columns.object.to_string()),
        action: columns.action.map(str::to_string),
        effect: columns.effect.map(str::to_string),
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_rules(&self) -> StoreResult<Vec<StoredRule>> {
        Ok(self.rows.read().await.items.clone())
    }

    async fn insert_rule(&self, row: &RuleRow) -> StoreResult<()> {
        self.rows.write().await.push(to_record(row));
        Ok(())
    }

    async fn delete_rule(&self, row: &RuleRow) -> StoreResult<u64> {
        let columns = RuleColumns::of(row);
        let mut rows = self.rows.write().await;
        let before = rows.items.len();
        rows.items.retain(|stored| !columns.matches(stored));
        Ok((before - rows.items.len()) as u64)
    }

    async fn replace_all(&self, replacement: &[RuleRow]) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        rows.items.clear();
        for row in replacement {
            rows.push(to_record(row));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
