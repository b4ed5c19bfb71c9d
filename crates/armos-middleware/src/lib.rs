//! `armos-middleware` – Telemetry plumbing
//!
//! Routes joint states, diagnostics and system alerts between the control
//! loops and external observers without caring about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
