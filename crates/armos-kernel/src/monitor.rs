//! [`HealthMonitor`] – motor current and error-code watchdog.
//!
//! Every poll reads the current draw and the firmware error bitmask of every
//! motor of every arm:
//!
//! * `|current| > threshold` → overcurrent fault;
//! * otherwise `error_code != 0` → error-code fault.
//!
//! A fault trips the [`FaultLatch`], is logged at error and is published on
//! [`Topic::Diagnostics`] as a `"Motor Error"` status.  A failed read is only
//! logged and gives no verdict for that reading; the other reading of the
//! same motor is still judged.  Polling continues after the latch is set so
//! later faults are still recorded.
//!
//! Call [`HealthMonitor::poll_once`] from a fixed-rate loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use armos_hal::recovery::{AdapterCall, Recovery, Violation, recovery_for_violation, report_failure};
use armos_hal::{ArmController, ArmSet, MotorController};
use armos_middleware::{EventBus, Topic};
use armos_types::{DiagnosticArray, DiagnosticLevel, DiagnosticStatus, Event, EventPayload, JointKey};
use chrono::Utc;
use tracing::{debug, error};

use crate::store::FaultLatch;

const SOURCE: &str = "armos-kernel::monitor";

/// Diagnostic status name for motor faults.
pub const MOTOR_ERROR: &str = "Motor Error";
/// Diagnostic status name for arms that failed to initialise.
pub const ARM_UNAVAILABLE: &str = "Arm Unavailable";

/// Tunables of the health monitor.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Overcurrent threshold in milliamps.
    pub current_threshold_ma: i32,
    /// Minimum spacing between two "Arm Unavailable" reports.
    pub unavailable_report_period: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            current_threshold_ma: 15_000,
            unavailable_report_period: Duration::from_secs(1),
        }
    }
}

/// A confirmed hardware violation found during one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultEvent {
    pub key: JointKey,
    pub violation: Violation,
    pub message: String,
}

pub struct HealthMonitor {
    arms: Arc<ArmSet>,
    latch: FaultLatch,
    bus: EventBus,
    settings: MonitorSettings,
    last_unavailable_report: Option<Instant>,
}

impl HealthMonitor {
    pub fn new(arms: Arc<ArmSet>, latch: FaultLatch, bus: EventBus, settings: MonitorSettings) -> Self {
        Self {
            arms,
            latch,
            bus,
            settings,
            last_unavailable_report: None,
        }
    }

    /// Run one monitoring pass over every motor and return the faults found.
    pub fn poll_once(&mut self) -> Vec<FaultEvent> {
        let mut faults = Vec::new();
        for arm in self.arms.iter() {
            for motor in arm.motors() {
                if let Some(fault) = self.check_motor(arm.as_ref(), motor.as_ref()) {
                    self.raise(&fault);
                    faults.push(fault);
                }
            }
        }
        self.report_unavailable_arms();
        faults
    }

    fn check_motor(&self, arm: &dyn ArmController, motor: &dyn MotorController) -> Option<FaultEvent> {
        let key = JointKey::new(arm.id(), motor.id());

        // Each reading is judged on its own; an unreadable one gives no verdict.
        match motor.get_current_current() {
            Ok(current) if current.unsigned_abs() > self.settings.current_threshold_ma.unsigned_abs() => {
                return Some(FaultEvent {
                    message: format!(
                        "Arm {} motor {}: overcurrent {} mA (threshold {} mA)",
                        key.arm, key.motor, current, self.settings.current_threshold_ma
                    ),
                    key,
                    violation: Violation::Overcurrent,
                });
            }
            Ok(_) => {}
            Err(e) => {
                report_failure(AdapterCall::ReadCurrent, &key.to_string(), &e);
            }
        }

        match motor.get_error_status() {
            Ok(0) => None,
            Ok(error_code) => Some(FaultEvent {
                message: format!("Arm {} motor {}: error=0x{:08X}", key.arm, key.motor, error_code),
                key,
                violation: Violation::MotorErrorCode,
            }),
            Err(e) => {
                report_failure(AdapterCall::ReadErrorStatus, &key.to_string(), &e);
                None
            }
        }
    }

    fn raise(&self, fault: &FaultEvent) {
        if recovery_for_violation(fault.violation) != Recovery::EscalateFault {
            return;
        }
        let newly_latched = self.latch.set(fault.message.clone());
        error!(
            joint = %fault.key,
            violation = ?fault.violation,
            newly_latched,
            "{}",
            fault.message
        );

        let status = DiagnosticStatus {
            name: MOTOR_ERROR.to_string(),
            level: DiagnosticLevel::Error,
            message: fault.message.clone(),
            hardware_id: fault.key.to_string(),
        };
        self.publish(vec![status]);
    }

    fn report_unavailable_arms(&mut self) {
        if self.arms.unavailable().is_empty() {
            return;
        }
        let due = self
            .last_unavailable_report
            .is_none_or(|at| at.elapsed() >= self.settings.unavailable_report_period);
        if !due {
            return;
        }
        self.last_unavailable_report = Some(Instant::now());

        let status = self
            .arms
            .unavailable()
            .iter()
            .map(|arm| DiagnosticStatus {
                name: ARM_UNAVAILABLE.to_string(),
                level: DiagnosticLevel::Warn,
                message: format!("Arm {} failed to initialise: {}", arm.id, arm.error),
                hardware_id: arm.id.clone(),
            })
            .collect();
        self.publish(status);
    }

    fn publish(&self, status: Vec<DiagnosticStatus>) {
        let event = Event::new(
            SOURCE,
            EventPayload::Diagnostics(DiagnosticArray {
                timestamp: Utc::now(),
                status,
            }),
        );
        match self.bus.publish_to(Topic::Diagnostics, event) {
            Ok(n) => debug!(receivers = n, "diagnostics published"),
            Err(e) => {
                report_failure(AdapterCall::Publish, SOURCE, &e);
            }
        }
    }
}
