//! Polled wait primitive used by the trajectory executor.
//!
//! [`wait_until`] sleeps toward a deadline in fixed increments and checks a
//! set of interrupt conditions before every increment.  The increment is the
//! latency bound for preemption and fault response: an interrupt raised
//! during a wait is observed no later than one increment after it was raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default poll increment.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a wait ended before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Preempted,
    Faulted,
}

/// Cooperative cancellation request for one goal.
#[derive(Debug, Clone, Default)]
pub struct PreemptToken(Arc<AtomicBool>);

impl PreemptToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wait until `deadline`, polling `check` every `poll` interval.
///
/// `check` is evaluated before every sleep; the first `Some(interrupt)` ends
/// the wait immediately.  A deadline already in the past still evaluates
/// `check` once.
pub fn wait_until<F>(deadline: Instant, poll: Duration, mut check: F) -> Result<(), Interrupt>
where
    F: FnMut() -> Option<Interrupt>,
{
    loop {
        if let Some(interrupt) = check() {
            return Err(interrupt);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep((deadline - now).min(poll));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_deadline_without_interrupt() {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(30);
        assert_eq!(wait_until(deadline, DEFAULT_POLL_INTERVAL, || None), Ok(()));
        assert!(Instant::now() >= deadline);
    }

    #[test]
    fn past_deadline_returns_immediately() {
        let start = Instant::now();
        assert_eq!(wait_until(start, DEFAULT_POLL_INTERVAL, || None), Ok(()));
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn past_deadline_still_checks_interrupts() {
        let result = wait_until(Instant::now(), DEFAULT_POLL_INTERVAL, || Some(Interrupt::Faulted));
        assert_eq!(result, Err(Interrupt::Faulted));
    }

    #[test]
    fn preemption_is_observed_within_one_increment() {
        let token = PreemptToken::new();
        let remote = token.clone();
        let requested_at = Arc::new(parking_lot::Mutex::new(None::<Instant>));
        let stamp = requested_at.clone();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            *stamp.lock() = Some(Instant::now());
            remote.request();
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = wait_until(deadline, DEFAULT_POLL_INTERVAL, || {
            token.is_requested().then_some(Interrupt::Preempted)
        });
        let observed_at = Instant::now();
        canceller.join().unwrap();

        assert_eq!(result, Err(Interrupt::Preempted));
        let requested = (*requested_at.lock()).expect("canceller stamped the request");
        let latency = observed_at - requested;
        assert!(latency <= Duration::from_millis(30), "latency {latency:?}");
    }
}
