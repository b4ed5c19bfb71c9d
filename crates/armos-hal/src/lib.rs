//! `armos-hal` – Hardware Abstraction Layer
//!
//! The engine never talks to motor-controller firmware directly.  It talks to
//! the [`ArmController`] and [`MotorController`] traits, so real drivers and
//! the in-process simulation are interchangeable.
//!
//! # Modules
//!
//! - [`controller`] – the adapter traits and the [`ArmSpec`] / [`ArmFactory`]
//!   bootstrap contract.
//! - [`arm_set`] – [`ArmSet`]: the runtime set of initialised arms, with a
//!   best-effort stop-all.
//! - [`recovery`] – the declared recovery action for every adapter call site.
//! - [`sim`] – simulated arms and motors with fault injection for tests and
//!   the demo daemon.

pub mod arm_set;
pub mod controller;
pub mod recovery;
pub mod sim;

pub use arm_set::{ArmSet, UnavailableArm};
pub use controller::{ArmController, ArmFactory, ArmSpec, MotorController};
pub use recovery::{AdapterCall, Recovery, Violation};
pub use sim::{SimArm, SimArmFactory, SimMotor};
