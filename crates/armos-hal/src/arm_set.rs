//! [`ArmSet`] – the runtime set of initialised arms.
//!
//! Built once at startup from the configured [`ArmSpec`]s.  Arms whose
//! controller fails to initialise are left out and remembered as
//! [`UnavailableArm`]s so the health monitor can keep reporting them.
//!
//! The set is immutable after construction and shared behind an `Arc` by
//! every control loop.

use std::sync::Arc;

use armos_types::ArmError;
use tracing::info;

use crate::controller::{ArmController, ArmFactory, ArmSpec};
use crate::recovery::{AdapterCall, report_failure};

/// An arm that was configured but could not be initialised.
#[derive(Debug, Clone, PartialEq)]
pub struct UnavailableArm {
    pub id: String,
    pub error: ArmError,
}

/// Ordered collection of arm controllers, keyed by arm id.
#[derive(Default)]
pub struct ArmSet {
    arms: Vec<Arc<dyn ArmController>>,
    unavailable: Vec<UnavailableArm>,
}

impl ArmSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise every arm in `specs` through `factory`.
    ///
    /// A failing arm is logged and omitted; the remaining arms are still
    /// initialised.
    pub fn initialize(specs: &[ArmSpec], factory: &dyn ArmFactory) -> Self {
        let mut set = Self::new();
        for spec in specs {
            match factory.create(spec) {
                Ok(arm) => {
                    info!(arm = %spec.id, motors = ?spec.motor_ids, "arm initialised");
                    set.register(arm);
                }
                Err(e) => {
                    report_failure(AdapterCall::InitArm, &spec.id, &e);
                    set.unavailable.push(UnavailableArm {
                        id: spec.id.clone(),
                        error: e,
                    });
                }
            }
        }
        set
    }

    /// Add an arm.  Any previously registered arm with the same id is
    /// replaced.
    pub fn register(&mut self, arm: Arc<dyn ArmController>) {
        match self.arms.iter().position(|a| a.id() == arm.id()) {
            Some(idx) => self.arms[idx] = arm,
            None => self.arms.push(arm),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ArmController>> {
        self.arms.iter().find(|a| a.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ArmController>> {
        self.arms.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.arms.iter().map(|a| a.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Arms that failed to initialise.
    pub fn unavailable(&self) -> &[UnavailableArm] {
        &self.unavailable
    }

    /// Issue `stop_motors()` on every arm.
    ///
    /// Failures are logged and do not prevent the remaining arms from being
    /// stopped.  Returns the number of arms whose stop command failed.
    pub fn stop_all(&self) -> usize {
        let mut failed = 0;
        for arm in &self.arms {
            if let Err(e) = arm.stop_motors() {
                report_failure(AdapterCall::StopMotors, arm.id(), &e);
                failed += 1;
            }
        }
        failed
    }
}
