//! [`TrajectoryExecutor`] – timed waypoint execution for one arm.
//!
//! # State machine
//!
//! ```text
//! Idle --(goal)--> Validating
//! Validating --(no waypoints)--> Aborted(InvalidGoal)
//! Validating --(unrepresentable offset)--> Aborted(InvalidGoal)
//! Validating --(waypoints)--> Executing
//! Executing --(preempt during wait)--> Preempted               [stop all arms]
//! Executing --(fault latch during wait)--> Aborted(HardwareFault) [stop all arms]
//! Executing --(write rejected)--> Aborted(GoalToleranceViolated)
//! Executing --(last waypoint written)--> Succeeded
//! ```
//!
//! Waypoint `i` is written no earlier than `start + time_from_start[i]` and
//! only after waypoint `i - 1` was written.  While waiting, the fault latch and
//! the preemption token are checked every poll increment; either one stops
//! every arm, not just this one.  A rejected write only aborts this goal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use armos_hal::recovery::{AdapterCall, report_failure};
use armos_hal::{ArmController, ArmSet};
use armos_kernel::{FaultLatch, JointCatalog, SharedStateStore};
use armos_types::{AbortReason, ExecutionOutcome, JointKey, TrajectoryFeedback, TrajectoryGoal};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::schedule::{Interrupt, PreemptToken, wait_until};

pub struct TrajectoryExecutor {
    arm: Arc<dyn ArmController>,
    all_arms: Arc<ArmSet>,
    store: SharedStateStore,
    latch: FaultLatch,
    catalog: Arc<JointCatalog>,
    poll_interval: Duration,
}

impl TrajectoryExecutor {
    /// Create the executor for `arm`.
    ///
    /// `all_arms` is the set stopped on preemption or fault; `poll_interval`
    /// bounds the reaction latency to either.
    pub fn new(
        arm: Arc<dyn ArmController>,
        all_arms: Arc<ArmSet>,
        store: SharedStateStore,
        catalog: Arc<JointCatalog>,
        poll_interval: Duration,
    ) -> Self {
        let latch = store.fault_latch();
        Self {
            arm,
            all_arms,
            store,
            latch,
            catalog,
            poll_interval,
        }
    }

    pub fn arm_id(&self) -> &str {
        self.arm.id()
    }

    /// Execute `goal` to completion and return its terminal outcome.
    ///
    /// `on_feedback` is called once per successfully written waypoint, in
    /// waypoint order.
    #[instrument(skip_all, fields(arm = %self.arm.id(), %goal_id, waypoints = goal.len()))]
    pub fn execute<F>(&self, goal_id: Uuid, goal: &TrajectoryGoal, preempt: &PreemptToken, mut on_feedback: F) -> ExecutionOutcome
    where
        F: FnMut(TrajectoryFeedback),
    {
        if goal.is_empty() {
            warn!("rejecting goal without waypoints");
            return ExecutionOutcome::aborted(AbortReason::InvalidGoal, "trajectory has no waypoints");
        }

        let start = Instant::now();
        let Some(deadlines) = goal
            .waypoints
            .iter()
            .map(|w| start.checked_add(w.time_from_start))
            .collect::<Option<Vec<Instant>>>()
        else {
            warn!("rejecting goal whose schedule cannot be represented");
            return ExecutionOutcome::aborted(AbortReason::InvalidGoal, "time_from_start overflows");
        };

        for (index, (waypoint, deadline)) in goal.waypoints.iter().zip(deadlines).enumerate() {
            let waited = wait_until(deadline, self.poll_interval, || {
                if self.latch.is_set() {
                    Some(Interrupt::Faulted)
                } else if preempt.is_requested() {
                    Some(Interrupt::Preempted)
                } else {
                    None
                }
            });
            if let Err(interrupt) = waited {
                return self.interrupt(interrupt, index);
            }

            if let Err(e) = self.arm.set_target_positions(&waypoint.positions) {
                report_failure(AdapterCall::WritePositions, self.arm.id(), &e);
                return ExecutionOutcome::aborted(AbortReason::GoalToleranceViolated, e.to_string());
            }
            debug!(index, positions = ?waypoint.positions, "waypoint dispatched");

            on_feedback(self.feedback(&waypoint.positions));
        }

        info!(elapsed = ?start.elapsed(), "trajectory succeeded");
        ExecutionOutcome::Succeeded
    }

    fn interrupt(&self, interrupt: Interrupt, index: usize) -> ExecutionOutcome {
        let failed_stops = self.all_arms.stop_all();
        match interrupt {
            Interrupt::Preempted => {
                warn!(index, failed_stops, "goal preempted; all arms stopped");
                ExecutionOutcome::Preempted
            }
            Interrupt::Faulted => {
                let reason = self
                    .latch
                    .record()
                    .map(|r| r.reason)
                    .unwrap_or_else(|| "fault latch set".to_string());
                error!(index, failed_stops, %reason, "hardware fault; all arms stopped");
                ExecutionOutcome::aborted(AbortReason::HardwareFault, reason)
            }
        }
    }

    fn feedback(&self, desired: &[i32]) -> TrajectoryFeedback {
        let snapshot = self.store.snapshot();
        let mut joint_names = Vec::new();
        let mut actual = Vec::new();
        for motor in self.arm.motor_ids() {
            let key = JointKey::new(self.arm.id(), motor);
            if let Some(&counts) = snapshot.get(&key) {
                actual.push(self.catalog.to_radians(&key, counts));
            }
            joint_names.push(self.catalog.name(&key));
        }
        TrajectoryFeedback {
            joint_names,
            actual,
            desired: desired.to_vec(),
        }
    }
}
