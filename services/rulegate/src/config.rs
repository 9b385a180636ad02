use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://rulegate.db";
const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl SqliteConfig {
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            acquire_timeout_ms: 5_000,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

// Rulegate configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct RulegateConfig {
    pub storage: StorageBackend,
    pub sqlite: SqliteConfig,
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RulegateConfigOverride {
    storage: Option<String>,
    database_url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_ms: Option<u64>,
    model_path: Option<PathBuf>,
}

impl RulegateConfig {
    pub fn from_env() -> Result<Self> {
        let storage = std::env::var("RULEGATE_STORAGE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .parse()
            .with_context(|| "parse RULEGATE_STORAGE")?;
        let url = std::env::var("RULEGATE_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let max_connections = std::env::var("RULEGATE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .with_context(|| "parse RULEGATE_MAX_CONNECTIONS")?;
        let acquire_timeout_ms = std::env::var("RULEGATE_ACQUIRE_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .with_context(|| "parse RULEGATE_ACQUIRE_TIMEOUT_MS")?;
        let model_path = std::env::var("RULEGATE_MODEL_PATH").ok().map(PathBuf::from);
        Ok(Self {
            storage,
            sqlite: SqliteConfig {
                url,
                max_connections,
                acquire_timeout_ms,
            },
            model_path,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("RULEGATE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read RULEGATE_CONFIG: {path}"))?;
            let override_cfg: RulegateConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse rulegate config yaml")?;
            if let Some(value) = override_cfg.storage {
                config.storage = value.parse().with_context(|| "parse storage")?;
            }
            if let Some(value) = override_cfg.database_url {
                config.sqlite.url = value;
            }
            if let Some(value) = override_cfg.max_connections {
                config.sqlite.max_connections = value;
            }
            if let Some(value) = override_cfg.acquire_timeout_ms {
                config.sqlite.acquire_timeout_ms = value;
            }
            if let Some(value) = override_cfg.model_path {
                config.model_path = Some(value);
            }
        }
        Ok(config)
    }

    /// Custom Casbin model text, if a model path is configured.
    pub fn load_model_conf(&self) -> Result<Option<String>> {
        let Some(path) = &self.model_path else {
            return Ok(None);
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("read model file: {}", path.display()))?;
        Ok(Some(text))
    }
}
