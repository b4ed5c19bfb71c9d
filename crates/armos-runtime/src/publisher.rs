//! [`JointStatePublisher`] – aggregated joint-state publication.
//!
//! Each cycle reads the target positions of every arm, converts them to
//! radians through the [`JointCatalog`], publishes one [`JointStateMsg`] on
//! [`Topic::JointStates`] and then swaps the new positions into the
//! [`SharedStateStore`].
//!
//! A failed read skips that arm for the cycle; a failed publish is logged.
//! Neither is retried within the same cycle.

use std::sync::Arc;

use armos_hal::ArmSet;
use armos_hal::recovery::{AdapterCall, report_failure};
use armos_kernel::{JointCatalog, JointPositions, SharedStateStore};
use armos_middleware::{EventBus, Topic};
use armos_types::{ArmError, Event, EventPayload, JointKey, JointStateMsg};
use chrono::Utc;
use tracing::trace;

const SOURCE: &str = "armos-runtime::publisher";

pub struct JointStatePublisher {
    arms: Arc<ArmSet>,
    store: SharedStateStore,
    bus: EventBus,
    catalog: Arc<JointCatalog>,
}

impl JointStatePublisher {
    pub fn new(arms: Arc<ArmSet>, store: SharedStateStore, bus: EventBus, catalog: Arc<JointCatalog>) -> Self {
        Self {
            arms,
            store,
            bus,
            catalog,
        }
    }

    /// Run one publish cycle and return the message that was published.
    pub fn publish_once(&self) -> JointStateMsg {
        let mut positions = JointPositions::new();
        let mut msg = JointStateMsg {
            timestamp: Utc::now(),
            name: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
        };

        for arm in self.arms.iter() {
            let counts = match arm.get_target_positions() {
                Ok(counts) => counts,
                Err(e) => {
                    report_failure(AdapterCall::ReadPositions, arm.id(), &e);
                    continue;
                }
            };
            let motor_ids = arm.motor_ids();
            if counts.len() != motor_ids.len() {
                let e = ArmError::hardware(
                    arm.id(),
                    format!("reported {} positions for {} motors", counts.len(), motor_ids.len()),
                );
                report_failure(AdapterCall::ReadPositions, arm.id(), &e);
                continue;
            }
            for (motor, count) in motor_ids.into_iter().zip(counts) {
                let key = JointKey::new(arm.id(), motor);
                msg.name.push(self.catalog.name(&key));
                msg.position.push(self.catalog.to_radians(&key, count));
                msg.velocity.push(0.0);
                positions.insert(key, count);
            }
        }

        let event = Event::new(SOURCE, EventPayload::JointState(msg.clone()));
        match self.bus.publish_to(Topic::JointStates, event) {
            Ok(n) => trace!(receivers = n, joints = msg.name.len(), "joint state published"),
            Err(e) => {
                report_failure(AdapterCall::Publish, SOURCE, &e);
            }
        }

        self.store.replace(positions);
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armos_hal::{ArmSpec, SimArm};
    use armos_kernel::DEFAULT_RAD_PER_COUNT;

    struct Fixture {
        publisher: JointStatePublisher,
        store: SharedStateStore,
        bus: EventBus,
        left: Arc<SimArm>,
        right: Arc<SimArm>,
    }

    fn fixture() -> Fixture {
        let specs = vec![ArmSpec::new("left", vec![1, 2]), ArmSpec::new("right", vec![1, 2])];
        let left = SimArm::new("left", vec![1, 2]);
        let right = SimArm::new("right", vec![1, 2]);
        let mut arms = ArmSet::new();
        arms.register(left.clone());
        arms.register(right.clone());
        let catalog = JointCatalog::new(&specs, &[], DEFAULT_RAD_PER_COUNT).unwrap();

        let store = SharedStateStore::new();
        let bus = EventBus::default();
        let publisher = JointStatePublisher::new(Arc::new(arms), store.clone(), bus.clone(), Arc::new(catalog));
        Fixture {
            publisher,
            store,
            bus,
            left,
            right,
        }
    }

    #[test]
    fn publishes_one_entry_per_joint_with_zero_velocity() {
        let f = fixture();
        f.left.set_positions(&[1000, -500]);
        f.right.set_positions(&[250, 0]);

        let msg = f.publisher.publish_once();
        assert_eq!(msg.name, vec!["left_joint1", "left_joint2", "right_joint1", "right_joint2"]);
        let expected = [1.0, -0.5, 0.25, 0.0];
        for (got, want) in msg.position.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
        assert!(msg.velocity.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn consecutive_cycles_are_idempotent() {
        let f = fixture();
        f.left.set_positions(&[1234, 5678]);
        let first = f.publisher.publish_once();
        let second = f.publisher.publish_once();
        assert_eq!(first.name, second.name);
        assert_eq!(first.position, second.position);
        assert!((first.position[0] - 1.234).abs() < 1e-12);
    }

    #[test]
    fn store_holds_raw_counts_after_cycle() {
        let f = fixture();
        f.right.set_positions(&[42, 43]);
        f.publisher.publish_once();
        let snap = f.store.snapshot();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap[&JointKey::new("right", 2)], 43);
    }

    #[test]
    fn failing_arm_is_skipped_but_others_published() {
        let f = fixture();
        f.left.fail_reads(true);
        f.right.set_positions(&[7, 8]);

        let msg = f.publisher.publish_once();
        assert_eq!(msg.name, vec!["right_joint1", "right_joint2"]);
        let snap = f.store.snapshot();
        assert!(!snap.contains_key(&JointKey::new("left", 1)));
        assert_eq!(snap[&JointKey::new("right", 1)], 7);
    }

    #[test]
    fn message_reaches_subscribers() {
        let f = fixture();
        let mut rx = f.bus.subscribe_to(Topic::JointStates);
        f.publisher.publish_once();
        let events = rx.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0].payload, EventPayload::JointState(m) if m.name.len() == 4));
    }
}
