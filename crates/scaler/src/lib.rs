//! Carbon aware scaler controller
//!
//! Wires the decision engine from `scaler-lib` to configuration, a reconcile
//! loop and an HTTP API for probes, metrics and the latest decision.

pub mod api;
pub mod config;
