//! `armos-runtime` – Control loops and goal execution
//!
//! Wires the kernel's shared state to the hardware adapters and runs the
//! engine's concurrent units, each on its own thread:
//!
//! - [`publisher`] – [`JointStatePublisher`]: snapshots every arm's positions
//!   at a fixed rate and publishes the aggregated joint state.
//! - [`executor`] – [`TrajectoryExecutor`]: walks one goal's waypoints against
//!   the wall clock, honouring preemption and the fault latch.
//! - [`action_server`] – [`ArmActionServer`]: one executor thread per arm with
//!   a goal / feedback / result surface.
//! - [`supervisor`] – [`Supervisor`]: bootstraps the arm set, the loops and
//!   the action servers from an [`EngineConfig`].
//!
//! Supporting modules: [`schedule`] (the polled wait primitive), [`worker`]
//! (fixed-rate loop threads), [`config`] and [`telemetry`].

pub mod action_server;
pub mod config;
pub mod executor;
pub mod publisher;
pub mod schedule;
pub mod supervisor;
pub mod telemetry;
pub mod worker;

pub use action_server::{ArmActionServer, GoalHandle};
pub use config::{ArmConfig, CalibrationConfig, EngineConfig};
pub use executor::TrajectoryExecutor;
pub use publisher::JointStatePublisher;
pub use schedule::{Interrupt, PreemptToken};
pub use supervisor::Supervisor;
