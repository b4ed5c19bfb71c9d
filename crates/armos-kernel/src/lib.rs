//! `armos-kernel` – Shared state & safety
//!
//! The brainstem of ArmOS.  It does not plan motion; it holds the state every
//! control loop agrees on and latches faults.
//!
//! # Modules
//!
//! - [`store`] – [`SharedStateStore`][store::SharedStateStore] and
//!   [`FaultLatch`][store::FaultLatch]: the aggregated joint positions and the
//!   process-wide fault latch, behind one lock with bounded critical sections.
//! - [`catalog`] – [`JointCatalog`][catalog::JointCatalog]: joint names and
//!   counts-to-radians calibration per (arm, motor).
//! - [`monitor`] – [`HealthMonitor`][monitor::HealthMonitor]: polls motor
//!   current and error codes and trips the latch on violations.

pub mod catalog;
pub mod monitor;
pub mod store;

pub use catalog::{DEFAULT_RAD_PER_COUNT, JointCatalog};
pub use monitor::{FaultEvent, HealthMonitor, MonitorSettings};
pub use store::{FaultLatch, FaultRecord, JointPositions, SharedStateStore};
