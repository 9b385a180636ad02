// Rulegate command-line entry point.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rulegate::adapter::{FilteredPolicyAdapter, StoreAdapter};
use rulegate::authorizer::Authorizer;
use rulegate::config::{RulegateConfig, StorageBackend};
use rulegate::enforcer::CasbinBuilder;
use rulegate::gates::{Gate, can_submit_report};
use rulegate::observability;
use rulegate::store::RuleStore;
use rulegate::store::memory::InMemoryRuleStore;
use rulegate::store::sqlite::SqliteRuleStore;
use rulegate_policy::{PolicyModel, Principal, parse_policy_lines};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rulegate")]
#[command(about = "Manage and query role-based access rules")]
struct Args {
    /// Database URL (overrides RULEGATE_DATABASE_URL)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Storage backend: sqlite or memory
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    /// Print the Prometheus metrics snapshot to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide a single (subject, object, action) request
    Check {
        subject: String,
        object: String,
        action: String,
    },
    /// Show every UI gate for a user id
    Gates { user_id: i64 },
    AddPermission {
        subject: String,
        object: String,
        action: String,
        effect: String,
    },
    AddGrouping { member: String, group: String },
    RemovePermission {
        subject: String,
        object: String,
        action: String,
        effect: String,
    },
    RemoveGrouping { member: String, group: String },
    /// List stored rows with their ids
    List,
    /// Replace the stored policy with the rules in a policy file
    Import { file: PathBuf },
    /// Print the loaded policy as policy lines
    Export,
    /// Remove rules by field filter (not supported by the SQL adapter)
    RevokeFiltered {
        ptype: String,
        index: usize,
        values: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let metrics_handle =
        observability::init_observability("rulegate").context("install metrics recorder")?;
    let args = Args::parse();

    let mut config = RulegateConfig::from_env_or_yaml()?;
    if let Some(storage) = args.storage {
        config.storage = storage;
    }
    if let Some(url) = args.database.clone() {
        config.sqlite.url = url;
    }

    let result = run(config, args.command).await;
    if args.print_metrics {
        eprintln!("{}", metrics_handle.render());
    }
    result
}

async fn run(config: RulegateConfig, command: Command) -> Result<()> {
    let store = open_store(&config).await?;
    let adapter = Arc::new(StoreAdapter::new(Arc::clone(&store)));

    let builder = match config.load_model_conf()? {
        Some(text) => CasbinBuilder::new(text),
        None => CasbinBuilder::default(),
    };
    let authz = Authorizer::with_builder(adapter.clone(), Arc::new(builder))
        .await
        .context("load policy")?;

    match command {
        Command::Check {
            subject,
            object,
            action,
        } => {
            let allowed = authz.check_access(&subject, &object, &action);
            println!("{}", if allowed { "allow" } else { "deny" });
        }
        Command::Gates { user_id } => {
            let principal = Principal::from_user_id(user_id);
            for gate in Gate::all() {
                let allowed = authz.allows(principal.as_str(), gate);
                println!("{gate}: {}", if allowed { "allow" } else { "deny" });
            }
            println!(
                "submit report: {}",
                if can_submit_report(&authz, principal.as_str()) {
                    "allow"
                } else {
                    "deny"
                }
            );
        }
        Command::AddPermission {
            subject,
            object,
            action,
            effect,
        } => {
            authz
                .add_policy("p", "p", &[subject, object, action, effect])
                .await
                .context("add permission")?;
        }
        Command::AddGrouping { member, group } => {
            authz
                .add_policy("g", "g", &[member, group])
                .await
                .context("add grouping")?;
        }
        Command::RemovePermission {
            subject,
            object,
            action,
            effect,
        } => {
            let removed = authz
                .remove_policy("p", "p", &[subject, object, action, effect])
                .await
                .context("remove permission")?;
            println!("removed: {removed}");
        }
        Command::RemoveGrouping { member, group } => {
            let removed = authz
                .remove_policy("g", "g", &[member, group])
                .await
                .context("remove grouping")?;
            println!("removed: {removed}");
        }
        Command::List => {
            for row in store.list_rules().await? {
                let columns = [row.subject, row.object, row.action, row.effect]
                    .map(|value| value.unwrap_or_else(|| "NULL".to_string()));
                println!(
                    "{}\t{}\t{}",
                    row.id,
                    row.kind.as_deref().unwrap_or("NULL"),
                    columns.join("\t")
                );
            }
        }
        Command::Import { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read policy file: {}", file.display()))?;
            let rows = parse_policy_lines(&text)
                .with_context(|| format!("parse policy file: {}", file.display()))?;
            let model = PolicyModel::from_rows(rows);
            let count = model.len();
            authz.replace_policy(model).await.context("import policy")?;
            tracing::info!(rules = count, "policy imported");
        }
        Command::Export => {
            for line in authz.model()?.to_lines() {
                println!("{line}");
            }
        }
        Command::RevokeFiltered {
            ptype,
            index,
            values,
        } => {
            let removed = adapter
                .remove_filtered_policy(&ptype, &ptype, index, &values)
                .await
                .context("revoke filtered rules")?;
            println!("removed: {removed}");
        }
    }
    Ok(())
}

async fn open_store(config: &RulegateConfig) -> Result<Arc<dyn RuleStore>> {
    let store: Arc<dyn RuleStore> = match config.storage {
        StorageBackend::Sqlite => Arc::new(
            SqliteRuleStore::connect(&config.sqlite)
                .await
                .context("connect rule store")?,
        ),
        StorageBackend::Memory => Arc::new(InMemoryRuleStore::new()),
    };
    store.health_check().await.context("rule store health check")?;
    if !store.is_durable() {
        tracing::warn!(
            backend = store.backend_name(),
            "rule store is not durable; changes are lost on exit"
        );
    }
    Ok(store)
}
