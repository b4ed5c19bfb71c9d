use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a single motor within one arm (bus address on the motor
/// controller).
pub type MotorId = u8;

/// Composite key addressing one motor of one arm, e.g. `left/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointKey {
    pub arm: String,
    pub motor: MotorId,
}

impl JointKey {
    pub fn new(arm: impl Into<String>, motor: MotorId) -> Self {
        Self {
            arm: arm.into(),
            motor,
        }
    }
}

impl fmt::Display for JointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.arm, self.motor)
    }
}

/// One timed target joint-position vector within a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Target positions in raw encoder counts, one per motor in arm order.
    pub positions: Vec<i32>,
    /// Offset from the start of the trajectory.
    pub time_from_start: Duration,
}

impl Waypoint {
    pub fn new(positions: Vec<i32>, time_from_start: Duration) -> Self {
        Self {
            positions,
            time_from_start,
        }
    }
}

/// Ordered sequence of waypoints for one arm.
///
/// Offsets are expected to be non-decreasing; the executor does not reorder
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryGoal {
    pub waypoints: Vec<Waypoint>,
}

impl TrajectoryGoal {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }
}

/// Progress report emitted once per dispatched waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFeedback {
    pub joint_names: Vec<String>,
    /// Measured positions in radians, taken from the latest joint-state snapshot.
    pub actual: Vec<f64>,
    /// The waypoint positions just commanded, in raw counts.
    pub desired: Vec<i32>,
}

/// Why a goal was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The goal was rejected before execution (e.g. no waypoints).
    InvalidGoal,
    /// The fault latch tripped while the goal was in flight.
    HardwareFault,
    /// The arm controller refused a position write.
    GoalToleranceViolated,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::InvalidGoal => write!(f, "INVALID_GOAL"),
            AbortReason::HardwareFault => write!(f, "HARDWARE_FAULT"),
            AbortReason::GoalToleranceViolated => write!(f, "GOAL_TOLERANCE_VIOLATED"),
        }
    }
}

/// Terminal result of one goal. Produced exactly once per goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Succeeded,
    Aborted { reason: AbortReason, detail: String },
    /// Client-initiated cancellation.
    Preempted,
}

impl ExecutionOutcome {
    pub fn aborted(reason: AbortReason, detail: impl Into<String>) -> Self {
        ExecutionOutcome::Aborted {
            reason,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded)
    }

    /// The abort reason, if this outcome is an abort.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            ExecutionOutcome::Aborted { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionOutcome::Succeeded => write!(f, "SUCCEEDED"),
            ExecutionOutcome::Aborted { reason, detail } => write!(f, "ABORTED({reason}): {detail}"),
            ExecutionOutcome::Preempted => write!(f, "PREEMPTED"),
        }
    }
}

/// Aggregated joint state across every arm. Parallel vectors, one entry per
/// (arm, motor) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointStateMsg {
    pub timestamp: DateTime<Utc>,
    pub name: Vec<String>,
    /// Positions in radians.
    pub position: Vec<f64>,
    /// Always zero: velocity is not observed by the controllers.
    pub velocity: Vec<f64>,
}

/// Severity of a [`DiagnosticStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticStatus {
    pub name: String,
    pub level: DiagnosticLevel,
    pub message: String,
    /// Component the status refers to, e.g. `"left/3"`.
    pub hardware_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticArray {
    pub timestamp: DateTime<Utc>,
    pub status: Vec<DiagnosticStatus>,
}

/// Unified event wrapper for the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "armos-runtime::publisher"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh envelope stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    JointState(JointStateMsg),
    Diagnostics(DiagnosticArray),
    /// Operator- or signal-initiated stop of every arm.
    EmergencyStop { reason: String },
}

/// Global error type spanning adapter failures, channel plumbing and
/// configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("{component} unavailable: {details}")]
    Unavailable { component: String, details: String },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl ArmError {
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        ArmError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }

    pub fn unavailable(component: impl Into<String>, details: impl Into<String>) -> Self {
        ArmError::Unavailable {
            component: component.into(),
            details: details.into(),
        }
    }
}
