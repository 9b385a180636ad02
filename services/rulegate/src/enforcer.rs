//! Casbin enforcer builder and evaluator seam.
//!
//! # Purpose and responsibility
//! Compiles a [`PolicyModel`] into an in-memory Casbin enforcer and answers
//! `(subject, object, action)` queries against it.
//!
//! # Where it fits
//! The authorizer rebuilds an evaluator after every load or mutation and
//! swaps it in whole, so an evaluator is immutable once built.
//!
//! # Key invariants and assumptions
//! - The default Casbin model is embedded in `rulegate-policy`.
//! - Subjects inherit permissions through grouping rules, transitively.
//! - A matching deny rule overrides any matching allow rule; no match denies.
//!
//! # Security considerations
//! - Evaluation errors are surfaced as [`EnforcementError`]; callers must
//!   treat them as deny.
use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi};
use rulegate_policy::{PolicyModel, casbin_model_string};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnforcementError {
    #[error("policy engine error: {0}")]
    Engine(#[from] casbin::Error),
    #[error("policy evaluation failed: {0}")]
    Evaluation(String),
    #[error("policy state lock poisoned")]
    Poisoned,
}

pub type EnforceResult<T> = Result<T, EnforcementError>;

/// Answers decision queries against one compiled policy.
pub trait Evaluator: Send + Sync {
    fn enforce(&self, subject: &str, object: &str, action: &str) -> EnforceResult<bool>;
}

/// Compiles a policy model into an [`Evaluator`].
#[async_trait]
pub trait EvaluatorBuilder: Send + Sync {
    async fn build(&self, model: &PolicyModel) -> EnforceResult<Box<dyn Evaluator>>;
}

/// Builds Casbin-backed evaluators from a model definition.
#[derive(Debug, Clone)]
pub struct CasbinBuilder {
    model_conf: String,
}

impl CasbinBuilder {
    pub fn new(model_conf: impl Into<String>) -> Self {
        Self {
            model_conf: model_conf.into(),
        }
    }
}

impl Default for CasbinBuilder {
    fn default() -> Self {
        Self::new(casbin_model_string())
    }
}

#[async_trait]
impl EvaluatorBuilder for CasbinBuilder {
    async fn build(&self, model: &PolicyModel) -> EnforceResult<Box<dyn Evaluator>> {
        let enforcer = build_enforcer(&self.model_conf, model).await?;
        Ok(Box::new(CasbinEvaluator { enforcer }))
    }
}

pub struct CasbinEvaluator {
    enforcer: Enforcer,
}

impl Evaluator for CasbinEvaluator {
    fn enforce(&self, subject: &str, object: &str, action: &str) -> EnforceResult<bool> {
        Ok(self.enforcer.enforce((subject, object, action))?)
    }
}

/// Build an in-memory Casbin enforcer for a policy model.
///
/// # What it does
/// Loads the model definition, inserts permission and grouping rules, and
/// compiles role links for efficient enforcement.
///
/// # Errors
/// - Returns Casbin errors for an invalid model definition or rule insertion
///   failures.
///
/// # Example
/// ```rust
/// use rulegate::enforcer::build_enforcer;
/// use rulegate_policy::{PolicyModel, casbin_model_string};
///
/// # async fn build() -> casbin::Result<()> {
/// let model = PolicyModel::from_lines(["p, admins, admin_text, read, allow"]).unwrap();
/// let _ = build_enforcer(casbin_model_string(), &model).await?;
/// # Ok(())
/// # }
/// ```
pub async fn build_enforcer(model_conf: &str, policy: &PolicyModel) -> casbin::Result<Enforcer> {
    // Step 1: Load the model definition.
    let model = DefaultModel::from_str(model_conf).await?;
    // Step 2: Use an in-memory adapter; the rule store is managed separately.
    let adapter = MemoryAdapter::default();
    let mut enforcer = Enforcer::new(model, adapter).await?;

    for rule in policy.permissions() {
        // Step 3: Insert permission rules with their effect. Duplicates are
        // reported as `false` and ignored.
        enforcer.add_policy(rule.to_fields()).await?;
    }

    for rule in policy.groupings() {
        // Step 4: Insert grouping rules.
        enforcer.add_grouping_policy(rule.to_fields()).await?;
    }

    // Step 5: Build role links after all rules are loaded.
    enforcer.build_role_links()?;
    Ok(enforcer)
}
