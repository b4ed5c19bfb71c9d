//! [`Supervisor`] – bootstraps and owns every running part of the engine.
//!
//! Startup order:
//!
//! 1. Validate the [`EngineConfig`] and build the [`JointCatalog`].
//! 2. Initialise the arm set through the [`ArmFactory`]; arms that fail are
//!    left out and reported by the health monitor.
//! 3. Start one [`ArmActionServer`] per available arm.
//! 4. Spawn the joint-state publisher and health monitor loops.
//!
//! Dropping the supervisor tears everything down; [`Supervisor::shutdown`]
//! does the same with logging.

use std::sync::Arc;

use armos_hal::{ArmFactory, ArmSet};
use armos_kernel::{FaultLatch, FaultRecord, HealthMonitor, JointCatalog, SharedStateStore};
use armos_middleware::{EventBus, Topic};
use armos_types::{ArmError, Event, EventPayload, TrajectoryGoal};
use tracing::{error, info, warn};

use crate::action_server::{ArmActionServer, GoalHandle};
use crate::config::EngineConfig;
use crate::executor::TrajectoryExecutor;
use crate::publisher::JointStatePublisher;
use crate::worker::LoopWorker;

const SOURCE: &str = "armos-runtime::supervisor";

pub struct Supervisor {
    arms: Arc<ArmSet>,
    store: SharedStateStore,
    bus: EventBus,
    catalog: Arc<JointCatalog>,
    servers: Vec<ArmActionServer>,
    workers: Vec<LoopWorker>,
}

impl Supervisor {
    /// Bring the engine up.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Config`] for an invalid configuration and
    /// [`ArmError::Channel`] if a thread cannot be spawned.  Arms that fail to
    /// initialise are not an error.
    pub fn start(config: &EngineConfig, factory: &dyn ArmFactory, bus: EventBus) -> Result<Self, ArmError> {
        config.validate()?;
        let catalog = Arc::new(config.joint_catalog()?);
        let arms = Arc::new(ArmSet::initialize(&config.arm_specs(), factory));
        if arms.is_empty() {
            warn!("no arm initialised; only diagnostics will run");
        }
        let store = SharedStateStore::new();

        let mut servers = Vec::with_capacity(arms.len());
        for arm in arms.iter() {
            let executor = TrajectoryExecutor::new(
                arm.clone(),
                arms.clone(),
                store.clone(),
                catalog.clone(),
                config.poll_interval(),
            );
            servers.push(ArmActionServer::start(executor)?);
        }

        let publisher = JointStatePublisher::new(arms.clone(), store.clone(), bus.clone(), catalog.clone());
        let mut monitor = HealthMonitor::new(arms.clone(), store.fault_latch(), bus.clone(), config.monitor_settings());
        let workers = vec![
            LoopWorker::spawn("joint-state-publisher", config.publish_rate_hz, move || {
                publisher.publish_once();
            })?,
            LoopWorker::spawn("health-monitor", config.monitor_rate_hz, move || {
                monitor.poll_once();
            })?,
        ];

        info!(
            arms = ?arms.ids(),
            unavailable = arms.unavailable().len(),
            publish_rate_hz = config.publish_rate_hz,
            monitor_rate_hz = config.monitor_rate_hz,
            poll_interval_ms = config.poll_interval_ms,
            "supervisor started"
        );

        Ok(Self {
            arms,
            store,
            bus,
            catalog,
            servers,
            workers,
        })
    }

    /// Submit `goal` to `arm`, preempting that arm's previous goal.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Unavailable`] for an unknown or uninitialised arm.
    pub fn send_goal(&self, arm: &str, goal: TrajectoryGoal) -> Result<GoalHandle, ArmError> {
        self.action_server(arm)
            .ok_or_else(|| ArmError::unavailable(arm, "no action server for this arm"))?
            .send_goal(goal)
    }

    pub fn action_server(&self, arm: &str) -> Option<&ArmActionServer> {
        self.servers.iter().find(|s| s.arm() == arm)
    }

    pub fn arms(&self) -> &Arc<ArmSet> {
        &self.arms
    }

    pub fn store(&self) -> &SharedStateStore {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn catalog(&self) -> &Arc<JointCatalog> {
        &self.catalog
    }

    pub fn fault_latch(&self) -> FaultLatch {
        self.store.fault_latch()
    }

    /// Preempt every goal, stop every arm and raise an alert on
    /// [`Topic::SystemAlerts`].  Returns the number of arms that failed to
    /// stop.
    pub fn emergency_stop(&self, reason: &str) -> usize {
        for server in &self.servers {
            server.cancel_all();
        }
        let failed = self.arms.stop_all();
        error!(reason, failed_stops = failed, "emergency stop");

        let event = Event::new(
            SOURCE,
            EventPayload::EmergencyStop {
                reason: reason.to_string(),
            },
        );
        if let Err(e) = self.bus.publish_to(Topic::SystemAlerts, event) {
            warn!(error = %e, "failed to publish emergency stop alert");
        }
        failed
    }

    /// Clear the fault latch.  Returns the record that was cleared.
    pub fn reset_fault(&self) -> Option<FaultRecord> {
        let cleared = self.store.fault_latch().reset();
        match &cleared {
            Some(record) => info!(reason = %record.reason, raised_at = %record.raised_at, "fault latch reset"),
            None => info!("fault latch reset requested but not set"),
        }
        cleared
    }

    /// Preempt goals, join the executor threads, then stop the loops.
    pub fn shutdown(mut self) {
        info!("supervisor shutting down");
        for server in self.servers.drain(..) {
            server.shutdown();
        }
        for worker in self.workers.drain(..) {
            let name = worker.name().to_string();
            worker.shutdown();
            info!(worker = %name, "loop joined");
        }
        info!("supervisor stopped");
    }
}
