//! Authorization facade used at every gated decision point.
//!
//! # Purpose and responsibility
//! Owns the current policy model and its compiled evaluator, answers decision
//! queries, and routes policy mutations through the adapter.
//!
//! # Key invariants and assumptions
//! - Construction loads the policy; a load failure is returned and the
//!   caller must not serve decisions without a policy.
//! - `check_access` never fails: any evaluation error resolves to deny.
//! - Readers see either the policy before a mutation or after it, never a
//!   partially applied change.
//!
//! # Concurrency model
//! - The `(model, evaluator)` pair lives in an `Arc` behind a
//!   `std::sync::RwLock`. Readers clone the `Arc` and evaluate without
//!   holding the lock.
//! - Mutations are serialized by an async mutex. Each one derives the new
//!   model and compiles its evaluator before touching the store, then writes
//!   the store and swaps the `Arc`. A policy that fails to compile is never
//!   persisted.
use crate::adapter::{AdapterError, PolicyAdapter};
use crate::enforcer::{
    CasbinBuilder, EnforceResult, EnforcementError, Evaluator, EvaluatorBuilder,
};
use crate::gates::Gate;
use rulegate_policy::{PolicyError, PolicyModel, RuleRow};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Enforcement(#[from] EnforcementError),
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] PolicyError),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

struct PolicyState {
    model: PolicyModel,
    evaluator: Box<dyn Evaluator>,
}

pub struct Authorizer {
    adapter: Arc<dyn PolicyAdapter>,
    builder: Arc<dyn EvaluatorBuilder>,
    state: RwLock<Arc<PolicyState>>,
    writer: Mutex<()>,
}

impl Authorizer {
    /// Load the policy through `adapter` and compile it with the embedded
    /// Casbin model.
    pub async fn new(adapter: Arc<dyn PolicyAdapter>) -> AuthzResult<Self> {
        Self::with_builder(adapter, Arc::new(CasbinBuilder::default())).await
    }

    pub async fn with_builder(
        adapter: Arc<dyn PolicyAdapter>,
        builder: Arc<dyn EvaluatorBuilder>,
    ) -> AuthzResult<Self> {
        let model = adapter.load_policy().await?;
        let evaluator = builder.build(&model).await?;
        record_rule_gauges(&model);
        tracing::info!(
            permissions = model.permissions().len(),
            groupings = model.groupings().len(),
            "authorizer initialized"
        );
        Ok(Self {
            adapter,
            builder,
            state: RwLock::new(Arc::new(PolicyState { model, evaluator })),
            writer: Mutex::new(()),
        })
    }

    /// Evaluate a decision query, surfacing evaluation errors.
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> EnforceResult<bool> {
        let state = self.current()?;
        state.evaluator.enforce(subject, object, action)
    }

    /// Decide whether `subject` may perform `action` on `object`.
    ///
    /// Fails closed: evaluation errors are logged and answered with `false`.
    pub fn check_access(&self, subject: &str, object: &str, action: &str) -> bool {
        match self.enforce(subject, object, action) {
            Ok(allowed) => {
                let decision = if allowed { "allow" } else { "deny" };
                metrics::counter!("rulegate_decisions_total", "decision" => decision)
                    .increment(1);
                tracing::debug!(subject, object, action, allowed, "access decision");
                allowed
            }
            Err(err) => {
                metrics::counter!("rulegate_decisions_total", "decision" => "error").increment(1);
                tracing::warn!(
                    subject,
                    object,
                    action,
                    error = %err,
                    "access check failed; denying"
                );
                false
            }
        }
    }

    pub fn allows(&self, subject: &str, gate: Gate) -> bool {
        self.check_access(subject, gate.object(), gate.action())
    }

    /// Copy of the currently loaded policy model.
    pub fn model(&self) -> Result<PolicyModel, EnforcementError> {
        Ok(self.current()?.model.clone())
    }

    /// Discard the in-memory policy and load it again from the store.
    pub async fn reload(&self) -> AuthzResult<()> {
        let _guard = self.writer.lock().await;
        let model = self.adapter.load_policy().await?;
        self.publish(model).await
    }

    pub async fn add_policy(&self, section: &str, ptype: &str, rule: &[String]) -> AuthzResult<()> {
        let row = RuleRow::from_assertion(section, ptype, rule)?;
        let _guard = self.writer.lock().await;
        let mut model = self.current()?.model.clone();
        model.add_rule(row);
        let evaluator = self.compile(&model).await?;

        self.adapter.add_policy(section, ptype, rule).await?;
        metrics::counter!("rulegate_policy_mutations_total", "op" => "add").increment(1);
        self.swap(model, evaluator)
    }

    /// Remove rules equal to `rule`; returns `false` if none were stored.
    pub async fn remove_policy(
        &self,
        section: &str,
        ptype: &str,
        rule: &[String],
    ) -> AuthzResult<bool> {
        let row = RuleRow::from_assertion(section, ptype, rule)?;
        let _guard = self.writer.lock().await;
        let mut model = self.current()?.model.clone();
        model.remove_rule(&row);
        let evaluator = self.compile(&model).await?;

        if !self.adapter.remove_policy(section, ptype, rule).await? {
            return Ok(false);
        }
        metrics::counter!("rulegate_policy_mutations_total", "op" => "remove").increment(1);
        self.swap(model, evaluator)?;
        Ok(true)
    }

    /// Persist the current in-memory policy, replacing all stored rules.
    pub async fn save_policy(&self) -> AuthzResult<()> {
        let _guard = self.writer.lock().await;
        let model = self.current()?.model.clone();
        self.adapter.save_policy(&model).await?;
        metrics::counter!("rulegate_policy_mutations_total", "op" => "save").increment(1);
        Ok(())
    }

    /// Persist `model` as the complete policy and start enforcing it.
    pub async fn replace_policy(&self, model: PolicyModel) -> AuthzResult<()> {
        let _guard = self.writer.lock().await;
        let evaluator = self.compile(&model).await?;
        self.adapter.save_policy(&model).await?;
        metrics::counter!("rulegate_policy_mutations_total", "op" => "replace").increment(1);
        self.swap(model, evaluator)
    }

    fn current(&self) -> EnforceResult<Arc<PolicyState>> {
        let guard = self.state.read().map_err(|_| EnforcementError::Poisoned)?;
        Ok(Arc::clone(&*guard))
    }

    async fn publish(&self, model: PolicyModel) -> AuthzResult<()> {
        let evaluator = self.compile(&model).await?;
        self.swap(model, evaluator)
    }

    async fn compile(&self, model: &PolicyModel) -> AuthzResult<Box<dyn Evaluator>> {
        self.builder.build(model).await.map_err(|err| {
            tracing::error!(error = %err, "failed to compile policy; keeping previous policy");
            AuthzError::from(err)
        })
    }

    fn swap(&self, model: PolicyModel, evaluator: Box<dyn Evaluator>) -> AuthzResult<()> {
        record_rule_gauges(&model);
        let next = Arc::new(PolicyState { model, evaluator });
        let mut guard = self.state.write().map_err(|_| EnforcementError::Poisoned)?;
        *guard = next;
        Ok(())
    }
}

fn record_rule_gauges(model: &PolicyModel) {
    metrics::gauge!("rulegate_policy_rules", "kind" => "p").set(model.permissions().len() as f64);
    metrics::gauge!("rulegate_policy_rules", "kind" => "g").set(model.groupings().len() as f64);
}
