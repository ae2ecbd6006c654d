//! Scaled targets that receive the replica cap
//!
//! A target is the object whose maximum replica count the reconciler manages.
//! Targets backed by an autoscaler (ScaledObject) report the autoscaler's
//! desired replicas, which feeds the demand guard; job-style targets
//! (ScaledJob) do not.

mod memory;

pub use memory::InMemoryTarget;

use crate::error::TargetError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of scaled target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    #[default]
    #[serde(rename = "scaledobjects.keda.sh", alias = "scaledobject")]
    ScaledObject,
    #[serde(rename = "scaledjobs.keda.sh", alias = "scaledjob")]
    ScaledJob,
}

impl TargetKind {
    /// Whether this kind exposes a desired-replica signal
    pub fn has_demand_signal(&self) -> bool {
        matches!(self, TargetKind::ScaledObject)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::ScaledObject => f.write_str("scaledobject"),
            TargetKind::ScaledJob => f.write_str("scaledjob"),
        }
    }
}

/// Observed replica counts of a target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub current_replicas: Option<u32>,
    pub desired_replicas: Option<u32>,
}

/// Trait for scaled target implementations
#[async_trait]
pub trait ScaleTarget: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> TargetKind;

    /// Read the current replica counts
    async fn snapshot(&self) -> Result<TargetSnapshot, TargetError>;

    /// Overwrite the target's maximum replica count
    async fn apply_max_replicas(&self, max_replicas: u32) -> Result<(), TargetError>;
}
