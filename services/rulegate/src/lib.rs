//! Rulegate: role-based access decisions backed by a persistent rule store.
//!
//! The crate layers a [`store::RuleStore`] (SQLite or in-memory) under a
//! [`adapter::PolicyAdapter`], compiles the loaded policy into a Casbin
//! evaluator, and exposes the fail-closed [`authorizer::Authorizer`] facade.
pub mod adapter;
pub mod authorizer;
pub mod config;
pub mod enforcer;
pub mod gates;
pub mod observability;
pub mod store;
