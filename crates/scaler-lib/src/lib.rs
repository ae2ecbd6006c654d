//! Carbon aware scaling library
//!
//! This crate provides the core functionality for:
//! - Deciding a workload's maximum replica count from a carbon intensity forecast
//! - Eco mode overrides (custom windows, recurring schedules, sustained intensity, demand)
//! - Forecast sources and scale targets
//! - The reconcile loop driving them
//! - Health checks and observability

pub mod decision;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod reconciler;
pub mod target;

pub use decision::{DecisionOrchestrator, OrchestratorConfig, ReplicaBandResolver, WakeScheduler};
pub use error::{DecisionError, ForecastError, PolicyError, TargetError};
pub use forecast::{ForecastSource, JsonFileForecastSource, MockForecastSource};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ScalerMetrics, StructuredLogger};
pub use reconciler::{ConditionReason, ReconcileReport, Reconciler, ReconcilerBuilder};
pub use target::{InMemoryTarget, ScaleTarget, TargetKind, TargetSnapshot};
