use rulegate::config::SqliteConfig;
use rulegate::store::sqlite::SqliteRuleStore;
use tempfile::TempDir;

/// A SQLite database file that lives as long as the returned directory.
pub async fn file_store() -> (SqliteRuleStore, SqliteConfig, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = SqliteConfig {
        url: format!("sqlite://{}", dir.path().join("rules.db").display()),
        max_connections: 2,
        acquire_timeout_ms: 5_000,
    };
    let store = SqliteRuleStore::connect(&cfg).await.expect("connect");
    (store, cfg, dir)
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
