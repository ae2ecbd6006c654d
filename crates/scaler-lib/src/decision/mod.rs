//! Carbon aware scaling decision engine
//!
//! Pure functions of their inputs: no I/O, no shared state. Forecast retrieval
//! and applying the resulting cap belong to the caller (see `reconciler`).

mod bands;
mod demand;
mod eco_mode;
mod orchestrator;
mod recurring;
mod wake;

#[cfg(test)]
mod tests;

pub use bands::ReplicaBandResolver;
pub use demand::DemandGuard;
pub use eco_mode::{EcoModeEvaluator, ScheduledWindow};
pub use orchestrator::{DecisionOrchestrator, OrchestratorConfig};
pub use recurring::RecurringRule;
pub use wake::{WakeScheduler, DEFAULT_GRANULARITY_MINUTES};
