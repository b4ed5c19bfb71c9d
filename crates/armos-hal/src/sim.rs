//! In-process simulation adapters for CI/CD testing without physical hardware.
//!
//! [`SimArm`] and [`SimMotor`] record every command and return scripted
//! readings.  Faults are injected through setter methods so tests can
//! reproduce overcurrent, firmware error codes, bus read failures and
//! rejected writes.
//!
//! # Stub behaviour
//!
//! | Call | Stub behaviour |
//! |---|---|
//! | `get_target_positions` | Returns the last written positions (initially all zero). |
//! | `set_target_positions` | Stores and logs the positions; rejects a wrong vector length. |
//! | `stop_motors` | Counts the call. |
//! | `get_current_current` | Returns the scripted current (initially 0 mA). |
//! | `get_error_status` | Returns the scripted bitmask (initially 0). |
//!
//! # Example
//!
//! ```rust
//! use armos_hal::{ArmController, SimArm};
//!
//! let arm = SimArm::new("left", vec![1, 2]);
//! arm.set_target_positions(&[100, -100]).unwrap();
//! assert_eq!(arm.get_target_positions().unwrap(), vec![100, -100]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};

use armos_types::{ArmError, MotorId};
use parking_lot::Mutex;

use crate::controller::{ArmController, ArmFactory, ArmSpec, MotorController};

// ────────────────────────────────────────────────────────────────────────────
// Simulated motor
// ────────────────────────────────────────────────────────────────────────────

/// A simulated motor with scripted current and error readings.
pub struct SimMotor {
    id: MotorId,
    label: String,
    current_ma: AtomicI32,
    error_status: AtomicU32,
    read_failure: AtomicBool,
    error_read_failure: AtomicBool,
}

impl SimMotor {
    pub fn new(arm: &str, id: MotorId) -> Arc<Self> {
        Arc::new(Self {
            id,
            label: format!("{arm}/{id}"),
            current_ma: AtomicI32::new(0),
            error_status: AtomicU32::new(0),
            read_failure: AtomicBool::new(false),
            error_read_failure: AtomicBool::new(false),
        })
    }

    /// Script the current draw reported from now on.
    pub fn set_current(&self, milliamps: i32) {
        self.current_ma.store(milliamps, Ordering::SeqCst);
    }

    /// Script the error bitmask reported from now on.
    pub fn set_error_status(&self, code: u32) {
        self.error_status.store(code, Ordering::SeqCst);
    }

    /// Make every subsequent current/error read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.read_failure.store(fail, Ordering::SeqCst);
    }

    /// Make only the error-status read fail; current reads are unaffected.
    pub fn fail_error_reads(&self, fail: bool) {
        self.error_read_failure.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> Result<(), ArmError> {
        if self.read_failure.load(Ordering::SeqCst) {
            return Err(ArmError::unavailable(&self.label, "simulated bus read timeout"));
        }
        Ok(())
    }
}

impl MotorController for SimMotor {
    fn id(&self) -> MotorId {
        self.id
    }

    fn get_current_current(&self) -> Result<i32, ArmError> {
        self.check_readable()?;
        Ok(self.current_ma.load(Ordering::SeqCst))
    }

    fn get_error_status(&self) -> Result<u32, ArmError> {
        self.check_readable()?;
        if self.error_read_failure.load(Ordering::SeqCst) {
            return Err(ArmError::unavailable(&self.label, "simulated status register timeout"));
        }
        Ok(self.error_status.load(Ordering::SeqCst))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated arm
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimArmState {
    positions: Vec<i32>,
    writes: Vec<Vec<i32>>,
    write_failure: Option<String>,
    read_failure: bool,
    stop_failure: bool,
}

/// A simulated arm that records every command it receives.
pub struct SimArm {
    id: String,
    motors: Vec<Arc<SimMotor>>,
    handles: Vec<Arc<dyn MotorController>>,
    state: Mutex<SimArmState>,
    stop_calls: AtomicUsize,
}

impl SimArm {
    pub fn new(id: impl Into<String>, motor_ids: Vec<MotorId>) -> Arc<Self> {
        let id = id.into();
        let motors: Vec<Arc<SimMotor>> = motor_ids.iter().map(|&m| SimMotor::new(&id, m)).collect();
        let handles = motors
            .iter()
            .map(|m| m.clone() as Arc<dyn MotorController>)
            .collect();
        Arc::new(Self {
            id,
            state: Mutex::new(SimArmState {
                positions: vec![0; motors.len()],
                ..SimArmState::default()
            }),
            motors,
            handles,
            stop_calls: AtomicUsize::new(0),
        })
    }

    /// The simulated motor with bus address `id`.
    pub fn motor(&self, id: MotorId) -> Option<Arc<SimMotor>> {
        self.motors.iter().find(|m| m.id == id).cloned()
    }

    /// Overwrite the reported positions without logging a write, as if the
    /// arm had been moved externally.
    pub fn set_positions(&self, positions: &[i32]) {
        self.state.lock().positions = positions.to_vec();
    }

    /// Every accepted `set_target_positions` call, oldest first.
    pub fn writes(&self) -> Vec<Vec<i32>> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Reject every subsequent write with `message`, or accept writes again
    /// when `None`.
    pub fn fail_writes(&self, message: Option<&str>) {
        self.state.lock().write_failure = message.map(str::to_string);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().read_failure = fail;
    }

    pub fn fail_stops(&self, fail: bool) {
        self.state.lock().stop_failure = fail;
    }

    /// Number of `stop_motors()` calls received, including failed ones.
    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl ArmController for SimArm {
    fn id(&self) -> &str {
        &self.id
    }

    fn motors(&self) -> &[Arc<dyn MotorController>] {
        &self.handles
    }

    fn get_target_positions(&self) -> Result<Vec<i32>, ArmError> {
        let state = self.state.lock();
        if state.read_failure {
            return Err(ArmError::unavailable(&self.id, "simulated position read timeout"));
        }
        Ok(state.positions.clone())
    }

    fn set_target_positions(&self, positions: &[i32]) -> Result<(), ArmError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.write_failure {
            return Err(ArmError::hardware(&self.id, message.clone()));
        }
        if positions.len() != self.motors.len() {
            return Err(ArmError::hardware(
                &self.id,
                format!(
                    "expected {} positions, got {}",
                    self.motors.len(),
                    positions.len()
                ),
            ));
        }
        state.positions = positions.to_vec();
        state.writes.push(positions.to_vec());
        Ok(())
    }

    fn stop_motors(&self) -> Result<(), ArmError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().stop_failure {
            return Err(ArmError::hardware(&self.id, "simulated stop command lost"));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Factory
// ────────────────────────────────────────────────────────────────────────────

/// [`ArmFactory`] producing [`SimArm`]s.  Arms named via [`failing`] refuse
/// to initialise.
///
/// [`failing`]: SimArmFactory::failing
#[derive(Default)]
pub struct SimArmFactory {
    failing: HashSet<String>,
    created: Mutex<HashMap<String, Arc<SimArm>>>,
}

impl SimArmFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make initialisation of arm `id` fail.
    pub fn failing(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// The simulated arm created for `id`, for fault injection.
    pub fn arm(&self, id: &str) -> Option<Arc<SimArm>> {
        self.created.lock().get(id).cloned()
    }
}

impl ArmFactory for SimArmFactory {
    fn create(&self, spec: &ArmSpec) -> Result<Arc<dyn ArmController>, ArmError> {
        if self.failing.contains(&spec.id) {
            return Err(ArmError::unavailable(&spec.id, "simulated controller did not respond"));
        }
        let arm = SimArm::new(spec.id.clone(), spec.motor_ids.clone());
        self.created.lock().insert(spec.id.clone(), arm.clone());
        Ok(arm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_arm_records_writes() {
        let arm = SimArm::new("left", vec![1, 2, 3]);
        arm.set_target_positions(&[1, 2, 3]).unwrap();
        arm.set_target_positions(&[4, 5, 6]).unwrap();
        assert_eq!(arm.writes(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(arm.get_target_positions().unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn sim_arm_rejects_wrong_length() {
        let arm = SimArm::new("left", vec![1, 2]);
        let err = arm.set_target_positions(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("expected 2 positions"));
        assert_eq!(arm.write_count(), 0);
    }

    #[test]
    fn injected_write_failure_carries_message() {
        let arm = SimArm::new("left", vec![1]);
        arm.fail_writes(Some("CAN bus-off"));
        let err = arm.set_target_positions(&[10]).unwrap_err();
        assert!(err.to_string().contains("CAN bus-off"));
        arm.fail_writes(None);
        assert!(arm.set_target_positions(&[10]).is_ok());
    }

    #[test]
    fn sim_motor_scripted_readings() {
        let arm = SimArm::new("right", vec![7]);
        let motor = arm.motor(7).unwrap();
        motor.set_current(-1200);
        motor.set_error_status(0x10);
        let handle = &arm.motors()[0];
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.get_current_current().unwrap(), -1200);
        assert_eq!(handle.get_error_status().unwrap(), 0x10);

        motor.fail_reads(true);
        assert!(handle.get_current_current().is_err());
        assert!(handle.get_error_status().is_err());
    }

    #[test]
    fn factory_tracks_created_arms() {
        let factory = SimArmFactory::new().failing("broken");
        assert!(factory.create(&ArmSpec::new("left", vec![1])).is_ok());
        assert!(factory.create(&ArmSpec::new("broken", vec![1])).is_err());
        assert!(factory.arm("left").is_some());
        assert!(factory.arm("broken").is_none());
    }
}
