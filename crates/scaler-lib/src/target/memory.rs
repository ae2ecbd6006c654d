//! In-memory target for dry runs and tests

use super::{ScaleTarget, TargetKind, TargetSnapshot};
use crate::error::TargetError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct TargetState {
    max_replicas: Option<u32>,
    snapshot: TargetSnapshot,
}

/// Target that records the applied cap instead of patching a cluster object
#[derive(Debug)]
pub struct InMemoryTarget {
    name: String,
    kind: TargetKind,
    state: RwLock<TargetState>,
    reject_updates: AtomicBool,
}

impl InMemoryTarget {
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            state: RwLock::new(TargetState::default()),
            reject_updates: AtomicBool::new(false),
        }
    }

    /// Set the observed replica counts.
    ///
    /// Desired replicas are dropped for kinds without a demand signal.
    pub async fn set_observed(&self, current: Option<u32>, desired: Option<u32>) {
        let mut state = self.state.write().await;
        state.snapshot = TargetSnapshot {
            current_replicas: current,
            desired_replicas: desired.filter(|_| self.kind.has_demand_signal()),
        };
    }

    /// Make subsequent updates fail
    pub fn set_reject_updates(&self, reject: bool) {
        self.reject_updates.store(reject, Ordering::SeqCst);
    }

    /// Last cap applied, if any
    pub async fn max_replicas(&self) -> Option<u32> {
        self.state.read().await.max_replicas
    }
}

#[async_trait]
impl ScaleTarget for InMemoryTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TargetKind {
        self.kind
    }

    async fn snapshot(&self) -> Result<TargetSnapshot, TargetError> {
        Ok(self.state.read().await.snapshot)
    }

    async fn apply_max_replicas(&self, max_replicas: u32) -> Result<(), TargetError> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(TargetError::UpdateRejected {
                name: self.name.clone(),
                message: "updates disabled".to_string(),
            });
        }

        let mut state = self.state.write().await;
        debug!(
            target_name = %self.name,
            previous = ?state.max_replicas,
            max_replicas,
            "Applying max replicas"
        );
        state.max_replicas = Some(max_replicas);
        Ok(())
    }
}
