//! Cross-component tests.
//!
//! - `helpers.rs`: scripted gateway and setup utilities
//! - `scenarios.rs`: multi-tick battles through the orchestrator
//! - `properties.rs`: proptest invariants of the store and guard
//! - `runtime.rs`: loop thread lifecycle and injection

pub(crate) mod helpers;
