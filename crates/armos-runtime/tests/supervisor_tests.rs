//! End-to-end tests driving a full supervisor against simulated arms.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use armos_hal::SimArmFactory;
use armos_middleware::{EventBus, Topic, TopicReceiver};
use armos_runtime::{ArmConfig, EngineConfig, Supervisor};
use armos_types::{AbortReason, ArmError, Event, EventPayload, ExecutionOutcome, JointKey, TrajectoryGoal, Waypoint};

fn config() -> EngineConfig {
    EngineConfig {
        arms: vec![ArmConfig::new("left", vec![1, 2]), ArmConfig::new("right", vec![1, 2])],
        publish_rate_hz: 100.0,
        monitor_rate_hz: 50.0,
        unavailable_report_period_ms: 100,
        ..EngineConfig::default()
    }
}

fn goal(points: &[(i32, u64)]) -> TrajectoryGoal {
    TrajectoryGoal::new(
        points
            .iter()
            .map(|&(p, ms)| Waypoint::new(vec![p, p + 1], Duration::from_millis(ms)))
            .collect(),
    )
}

fn wait_for<F>(rx: &mut TopicReceiver, timeout: Duration, pred: F) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(event) = rx.drain().into_iter().find(|e| pred(e)) {
            return Some(event);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

fn has_status(event: &Event, name: &str) -> bool {
    matches!(&event.payload, EventPayload::Diagnostics(d) if d.status.iter().any(|s| s.name == name))
}

#[test]
fn goal_succeeds_and_positions_reach_the_store() {
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, EventBus::default()).unwrap();

    let handle = supervisor.send_goal("left", goal(&[(100, 0), (200, 20), (300, 40)])).unwrap();
    let feedback: Vec<_> = handle.feedback().iter().collect();
    assert_eq!(handle.wait().unwrap(), ExecutionOutcome::Succeeded);
    assert_eq!(feedback.len(), 3);
    assert_eq!(feedback[2].desired, vec![300, 301]);
    assert_eq!(feedback[0].joint_names, vec!["left_joint1", "left_joint2"]);

    thread::sleep(Duration::from_millis(60));
    let snapshot = supervisor.store().snapshot();
    assert_eq!(snapshot[&JointKey::new("left", 1)], 300);
    assert_eq!(snapshot[&JointKey::new("left", 2)], 301);
    assert_eq!(snapshot[&JointKey::new("right", 1)], 0);

    supervisor.shutdown();
}

#[test]
fn joint_states_are_published_for_every_joint() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe_to(Topic::JointStates);
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, bus).unwrap();

    let event = wait_for(&mut rx, Duration::from_secs(1), |e| matches!(e.payload, EventPayload::JointState(_)));
    let Some(Event {
        payload: EventPayload::JointState(msg),
        ..
    }) = event
    else {
        panic!("no joint state published");
    };
    assert_eq!(msg.name, vec!["left_joint1", "left_joint2", "right_joint1", "right_joint2"]);
    assert!(msg.velocity.iter().all(|&v| v == 0.0));

    supervisor.shutdown();
}

#[test]
fn overcurrent_aborts_in_flight_goal_and_stops_every_arm() {
    let bus = EventBus::default();
    let mut diagnostics = bus.subscribe_to(Topic::Diagnostics);
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, bus).unwrap();
    let left = factory.arm("left").unwrap();
    let right = factory.arm("right").unwrap();

    let handle = supervisor.send_goal("left", goal(&[(10, 0), (20, 5_000)])).unwrap();
    thread::sleep(Duration::from_millis(50));
    right.motor(2).unwrap().set_current(20_000);

    let outcome = handle.wait_timeout(Duration::from_secs(2)).unwrap().expect("goal finished");
    assert_eq!(outcome.abort_reason(), Some(AbortReason::HardwareFault));
    assert!(outcome.to_string().contains("overcurrent"), "{outcome}");
    assert!(left.stop_count() >= 1);
    assert!(right.stop_count() >= 1);
    assert!(supervisor.fault_latch().is_set());

    let event = wait_for(&mut diagnostics, Duration::from_secs(1), |e| has_status(e, "Motor Error"));
    assert!(event.is_some(), "no motor error diagnostic");

    // While latched, new goals abort immediately.
    let blocked = supervisor.send_goal("left", goal(&[(1, 0)])).unwrap();
    assert_eq!(blocked.wait().unwrap().abort_reason(), Some(AbortReason::HardwareFault));

    right.motor(2).unwrap().set_current(0);
    thread::sleep(Duration::from_millis(60));
    let cleared = supervisor.reset_fault().expect("latch was set");
    assert!(cleared.reason.contains("20000"), "{}", cleared.reason);

    let resumed = supervisor.send_goal("left", goal(&[(5, 0)])).unwrap();
    assert_eq!(resumed.wait().unwrap(), ExecutionOutcome::Succeeded);

    supervisor.shutdown();
}

#[test]
fn new_goal_preempts_previous_goal_on_same_arm() {
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, EventBus::default()).unwrap();

    let first = supervisor.send_goal("left", goal(&[(1, 0), (2, 5_000)])).unwrap();
    thread::sleep(Duration::from_millis(50));
    let second = supervisor.send_goal("left", goal(&[(9, 0)])).unwrap();

    assert_eq!(first.wait().unwrap(), ExecutionOutcome::Preempted);
    assert_eq!(second.wait().unwrap(), ExecutionOutcome::Succeeded);
    assert_eq!(factory.arm("left").unwrap().writes().last(), Some(&vec![9, 10]));

    supervisor.shutdown();
}

#[test]
fn arms_run_independently() {
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, EventBus::default()).unwrap();

    let left = supervisor.send_goal("left", goal(&[(1, 0), (2, 30)])).unwrap();
    let right = supervisor.send_goal("right", goal(&[(3, 0), (4, 30)])).unwrap();
    assert_eq!(left.wait().unwrap(), ExecutionOutcome::Succeeded);
    assert_eq!(right.wait().unwrap(), ExecutionOutcome::Succeeded);
    assert_eq!(factory.arm("right").unwrap().writes(), vec![vec![3, 4], vec![4, 5]]);

    supervisor.shutdown();
}

#[test]
fn unavailable_arm_is_reported_and_rejects_goals() {
    let bus = EventBus::default();
    let mut diagnostics = bus.subscribe_to(Topic::Diagnostics);
    let factory = SimArmFactory::new().failing("right");
    let supervisor = Supervisor::start(&config(), &factory, bus).unwrap();

    assert_eq!(supervisor.arms().ids(), vec!["left".to_string()]);
    assert!(matches!(
        supervisor.send_goal("right", goal(&[(1, 0)])),
        Err(ArmError::Unavailable { .. })
    ));

    let event = wait_for(&mut diagnostics, Duration::from_secs(1), |e| has_status(e, "Arm Unavailable"));
    assert!(event.is_some(), "no unavailable-arm diagnostic");

    let handle = supervisor.send_goal("left", goal(&[(1, 0)])).unwrap();
    assert_eq!(handle.wait().unwrap(), ExecutionOutcome::Succeeded);

    supervisor.shutdown();
}

#[test]
fn emergency_stop_preempts_goals_and_raises_alert() {
    let bus = EventBus::default();
    let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
    let factory = SimArmFactory::new();
    let supervisor = Supervisor::start(&config(), &factory, bus).unwrap();

    let handle = supervisor.send_goal("left", goal(&[(1, 0), (2, 5_000)])).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(supervisor.emergency_stop("operator"), 0);

    assert_eq!(handle.wait().unwrap(), ExecutionOutcome::Preempted);
    assert!(factory.arm("right").unwrap().stop_count() >= 1);
    let alert = wait_for(&mut alerts, Duration::from_millis(200), |e| {
        matches!(&e.payload, EventPayload::EmergencyStop { reason } if reason == "operator")
    });
    assert!(alert.is_some());

    supervisor.shutdown();
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = EngineConfig {
        poll_interval_ms: 0,
        ..config()
    };
    let result = Supervisor::start(&cfg, &SimArmFactory::new(), EventBus::default());
    assert!(matches!(result, Err(ArmError::Config(_))));
}

#[test]
fn emergency_stop_from_signal_thread_halts_further_writes() {
    let factory = SimArmFactory::new();
    let supervisor = Arc::new(Supervisor::start(&config(), &factory, EventBus::default()).unwrap());
    let left = factory.arm("left").unwrap();

    let sweep: Vec<(i32, u64)> = (0..50).map(|i| (i, i as u64 * 20)).collect();
    let handle = supervisor.send_goal("left", goal(&sweep)).unwrap();
    thread::sleep(Duration::from_millis(70));

    let weak = Arc::downgrade(&supervisor);
    thread::spawn(move || weak.upgrade().map(|s| s.emergency_stop("operator Ctrl-C")))
        .join()
        .unwrap();

    assert_eq!(handle.wait().unwrap(), ExecutionOutcome::Preempted);
    let writes = left.write_count();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(left.write_count(), writes, "arm moved after emergency stop");
    assert!(writes < 50);

    match Arc::try_unwrap(supervisor) {
        Ok(supervisor) => supervisor.shutdown(),
        Err(_) => panic!("signal thread kept the supervisor alive"),
    }
}
