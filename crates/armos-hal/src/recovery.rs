//! Local recovery policy for adapter failures.
//!
//! Every call into an [`ArmController`][crate::ArmController] or
//! [`MotorController`][crate::MotorController] has a declared recovery
//! action.  Call sites report failures through [`report_failure`], which logs
//! at the declared severity and hands back the action for the caller to
//! carry out.
//!
//! | Call site | Recovery | Log level |
//! |---|---|---|
//! | [`AdapterCall::InitArm`] | [`Recovery::SkipAndLog`] (arm omitted) | error |
//! | [`AdapterCall::ReadPositions`] | [`Recovery::SkipAndLog`] (arm skipped this tick) | warn |
//! | [`AdapterCall::ReadCurrent`] | [`Recovery::SkipAndLog`] (motor skipped this tick) | warn |
//! | [`AdapterCall::ReadErrorStatus`] | [`Recovery::SkipAndLog`] (motor skipped this tick) | warn |
//! | [`AdapterCall::WritePositions`] | [`Recovery::AbortGoal`] | error |
//! | [`AdapterCall::StopMotors`] | [`Recovery::LogOnly`] | error |
//! | [`AdapterCall::Publish`] | [`Recovery::LogOnly`] | warn |
//!
//! Confirmed hardware violations ([`Violation`]) always map to
//! [`Recovery::EscalateFault`].

use armos_types::ArmError;
use tracing::{error, warn};

/// An adapter or transport call site that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterCall {
    InitArm,
    ReadPositions,
    ReadCurrent,
    ReadErrorStatus,
    WritePositions,
    StopMotors,
    Publish,
}

/// A confirmed hardware safety violation detected by the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    Overcurrent,
    MotorErrorCode,
}

/// What the caller does after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Log and skip this item for the current cycle.
    SkipAndLog,
    /// Terminate the in-flight goal; other arms are unaffected.
    AbortGoal,
    /// Latch the process-wide fault.
    EscalateFault,
    /// Log and carry on as if the call had succeeded.
    LogOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Warn,
    Error,
}

const fn policy(call: AdapterCall) -> (Recovery, Severity) {
    match call {
        AdapterCall::InitArm => (Recovery::SkipAndLog, Severity::Error),
        AdapterCall::ReadPositions => (Recovery::SkipAndLog, Severity::Warn),
        AdapterCall::ReadCurrent => (Recovery::SkipAndLog, Severity::Warn),
        AdapterCall::ReadErrorStatus => (Recovery::SkipAndLog, Severity::Warn),
        AdapterCall::WritePositions => (Recovery::AbortGoal, Severity::Error),
        AdapterCall::StopMotors => (Recovery::LogOnly, Severity::Error),
        AdapterCall::Publish => (Recovery::LogOnly, Severity::Warn),
    }
}

/// Declared recovery action for a failing call site.
pub const fn recovery_for(call: AdapterCall) -> Recovery {
    policy(call).0
}

/// Declared recovery action for a confirmed violation.
pub const fn recovery_for_violation(_violation: Violation) -> Recovery {
    Recovery::EscalateFault
}

/// Log `err` from `call` on `component` at the declared severity and return
/// the declared recovery action.
pub fn report_failure(call: AdapterCall, component: &str, err: &ArmError) -> Recovery {
    let (recovery, severity) = policy(call);
    match severity {
        Severity::Warn => {
            warn!(?call, component, error = %err, ?recovery, "adapter call failed");
        }
        Severity::Error => {
            error!(?call, component, error = %err, ?recovery, "adapter call failed");
        }
    }
    recovery
}
