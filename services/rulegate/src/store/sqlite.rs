//! SQLite-backed rule store.
//!
//! # What this module is
//! Implements [`RuleStore`] over a single `rules` table using `sqlx`. It is
//! the durable source of truth for authorization facts; the in-memory policy
//! model is rebuilt from it.
//!
//! # Key invariants
//! - `list_rules` returns rows in `id` order so load order equals insertion
//!   order.
//! - `replace_all` deletes and re-inserts inside one transaction; a failure
//!   leaves the previous rows in place.
//! - Single inserts and deletes are individual statements; there is no
//!   transaction spanning several adapter calls.
//!
//! # Operational notes
//! - Migrations are embedded and run on connect, so callers can assume the
//!   schema exists.
//! - `sqlite::memory:` databases live only as long as their connection; the
//!   pool is pinned to one connection that is never recycled.
//! - Database URLs may embed paths worth keeping out of logs at `info`.
use super::{RuleColumns, RuleStore, StoreResult, StoredRule};
use crate::config::SqliteConfig;
use async_trait::async_trait;
use rulegate_policy::RuleRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

const INSERT_RULE: &str =
    "INSERT INTO rules (kind, subject, object, action, effect) VALUES (?, ?, ?, ?, ?)";

/// Durable rule store backed by SQLite.
///
/// # Example
/// ```rust,no_run
/// use rulegate::config::SqliteConfig;
/// use rulegate::store::sqlite::SqliteRuleStore;
///
/// async fn open(cfg: SqliteConfig) {
///     let _ = SqliteRuleStore::connect(&cfg).await;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct DbRule {
    id: i64,
    kind: Option<String>,
    subject: Option<String>,
    object: Option<String>,
    action: Option<String>,
    effect: Option<String>,
}

impl From<DbRule> for StoredRule {
    fn from(row: DbRule) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            subject: row.subject,
            object: row.object,
            action: row.action,
            effect: row.effect,
        }
    }
}

impl SqliteRuleStore {
    /// Open the pool, creating the database file if needed, and run migrations.
    pub async fn connect(cfg: &SqliteConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&cfg.url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections.max(1))
            .acquire_timeout(Duration::from_millis(cfg.acquire_timeout_ms));
        if cfg.is_in_memory() {
            // Every connection would otherwise open its own empty database.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(in_memory = cfg.is_in_memory(), "sqlite rule store ready");
        Ok(Self { pool })
    }

    /// Private in-memory database, mainly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect(&SqliteConfig::in_memory()).await
    }

    /// Insert a row with arbitrary column values, bypassing rule validation.
    ///
    /// Used to load legacy or externally written rows.
    pub async fn insert_raw(
        &self,
        kind: Option<&str>,
        columns: [Option<&str>; 4],
    ) -> StoreResult<i64> {
        let result = sqlx::query(INSERT_RULE)
            .bind(kind)
            .bind(columns[0])
            .bind(columns[1])
            .bind(columns[2])
            .bind(columns[3])
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    async fn list_rules(&self) -> StoreResult<Vec<StoredRule>> {
        let rows: Vec<DbRule> = sqlx::query_as(
            "SELECT id, kind, subject, object, action, effect FROM rules ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredRule::from).collect())
    }

    async fn insert_rule(&self, row: &RuleRow) -> StoreResult<()> {
        let columns = RuleColumns::of(row);
        sqlx::query(INSERT_RULE)
            .bind(columns.kind)
            .bind(columns.subject)
            .bind(columns.object)
            .bind(columns.action)
            .bind(columns.effect)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_rule(&self, row: &RuleRow) -> StoreResult<u64> {
        let columns = RuleColumns::of(row);
        let result = match (columns.action, columns.effect) {
            (Some(action), Some(effect)) => {
                sqlx::query(
                    "DELETE FROM rules \
                     WHERE (kind = ? OR kind IS NULL) \
                     AND subject = ? AND object = ? AND action = ? \
                     AND LOWER(TRIM(effect)) = ?",
                )
                .bind(columns.kind)
                .bind(columns.subject)
                .bind(columns.object)
                .bind(action)
                .bind(effect)
                .execute(&self.pool)
                .await?
            }
            _ => {
                sqlx::query(
                    "DELETE FROM rules \
                     WHERE (kind = ? OR kind IS NULL) \
                     AND subject = ? AND object = ? \
                     AND COALESCE(action, '') = '' AND COALESCE(effect, '') = ''",
                )
                .bind(columns.kind)
                .bind(columns.subject)
                .bind(columns.object)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn replace_all(&self, rows: &[RuleRow]) -> StoreResult<()> {
        // Replace atomically so a failed save never leaves an empty table.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM rules").execute(&mut *tx).await?;
        for row in rows {
            let columns = RuleColumns::of(row);
            sqlx::query(INSERT_RULE)
                .bind(columns.kind)
                .bind(columns.subject)
                .bind(columns.object)
                .bind(columns.action)
                .bind(columns.effect)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
