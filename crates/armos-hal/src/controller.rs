//! Adapter traits for per-arm and per-motor controllers.
//!
//! Drivers implement these traits and are collected into an
//! [`ArmSet`][crate::arm_set::ArmSet].  Every control loop only ever talks to
//! the traits, so drivers can be swapped without touching the executor or
//! the monitor.
//!
//! All methods take `&self`: one controller is shared by the publisher loop,
//! the health monitor and the arm's trajectory executor, each on its own
//! thread.  Implementations provide their own interior synchronisation.

use std::sync::Arc;

use armos_types::{ArmError, MotorId};
use serde::{Deserialize, Serialize};

/// A single actuator reporting its electrical health.
pub trait MotorController: Send + Sync {
    /// Bus address of this motor within its arm.
    fn id(&self) -> MotorId;

    /// Instantaneous current draw in milliamps.
    ///
    /// # Errors
    ///
    /// Returns an error when the reading is unavailable (bus timeout, CRC
    /// failure, …).
    fn get_current_current(&self) -> Result<i32, ArmError>;

    /// Raw error bitmask reported by the motor firmware; `0` means healthy.
    ///
    /// # Errors
    ///
    /// Returns an error when the reading is unavailable.
    fn get_error_status(&self) -> Result<u32, ArmError>;
}

/// A position-controlled kinematic chain owning a set of motors.
pub trait ArmController: Send + Sync {
    /// Stable identifier for this arm, e.g. `"left"`.
    fn id(&self) -> &str;

    /// Motors of this arm in position-vector order.
    fn motors(&self) -> &[Arc<dyn MotorController>];

    /// Motor identifiers in position-vector order.
    fn motor_ids(&self) -> Vec<MotorId> {
        self.motors().iter().map(|m| m.id()).collect()
    }

    /// Current target positions in raw encoder counts, one per motor.
    ///
    /// # Errors
    ///
    /// Returns an error when the positions cannot be read.
    fn get_target_positions(&self) -> Result<Vec<i32>, ArmError>;

    /// Command new target positions in raw encoder counts.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::HardwareFault`] when the command is rejected (e.g.
    /// wrong vector length, motor in fault state, bus write failure).
    fn set_target_positions(&self, positions: &[i32]) -> Result<(), ArmError>;

    /// Halt every motor of this arm in place.  Best effort.
    ///
    /// # Errors
    ///
    /// Returns an error when the stop command could not be delivered; callers
    /// log it and carry on.
    fn stop_motors(&self) -> Result<(), ArmError>;
}

/// Static description of one arm, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmSpec {
    pub id: String,
    pub motor_ids: Vec<MotorId>,
}

impl ArmSpec {
    pub fn new(id: impl Into<String>, motor_ids: Vec<MotorId>) -> Self {
        Self {
            id: id.into(),
            motor_ids,
        }
    }
}

/// Creates arm controllers at startup.
pub trait ArmFactory {
    /// Open the controller for `spec`.
    ///
    /// # Errors
    ///
    /// Returns an error when the arm cannot be initialised; the arm is then
    /// left out of the runtime arm set.
    fn create(&self, spec: &ArmSpec) -> Result<Arc<dyn ArmController>, ArmError>;
}
