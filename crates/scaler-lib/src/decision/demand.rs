//! Keeps the carbon cap from starving real load

use crate::models::{OverrideResult, OverrideTrigger};

/// Compares the computed cap against the autoscaler's desired replicas
pub struct DemandGuard;

impl DemandGuard {
    /// Override eco mode when the cap is below what the autoscaler wants now
    pub fn guard(computed_max: u32, observed_desired: u32) -> Option<OverrideResult> {
        if computed_max >= observed_desired {
            return None;
        }

        Some(OverrideResult::new(
            OverrideTrigger::Demand,
            format!(
                "max replicas of {} is less than the {} replicas the autoscaler desires",
                computed_max, observed_desired
            ),
        ))
    }
}
