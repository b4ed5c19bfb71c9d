//! [`LoopWorker`] – fixed-rate background loop thread.
//!
//! Runs a tick closure on a dedicated, named OS thread at a fixed rate until
//! shut down.  Deadlines advance by whole periods so the loop does not drift;
//! when a tick overruns by more than a period the schedule is re-anchored to
//! now instead of bursting to catch up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use armos_types::ArmError;
use tracing::{debug, warn};

/// Handle to a running fixed-rate loop.  Dropping it stops and joins the
/// thread.
pub struct LoopWorker {
    name: String,
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl LoopWorker {
    /// Spawn `tick` on a thread named `name`, invoked `rate_hz` times per
    /// second.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Config`] for a non-positive rate and
    /// [`ArmError::Channel`] if the thread cannot be spawned.
    pub fn spawn<F>(name: &str, rate_hz: f64, mut tick: F) -> Result<Self, ArmError>
    where
        F: FnMut() + Send + 'static,
    {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return Err(ArmError::Config(format!("{name}: rate must be > 0 Hz, got {rate_hz}")));
        }
        let period = Duration::from_secs_f64(1.0 / rate_hz);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(worker = %thread_name, ?period, "loop started");
                let mut next = Instant::now();
                while !stop.load(Ordering::Relaxed) {
                    tick();

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        sleep_interruptibly(next - now, &stop);
                    } else if now - next > period {
                        warn!(worker = %thread_name, overrun = ?(now - next), "tick overran; re-anchoring schedule");
                        next = now;
                    }
                }
                debug!(worker = %thread_name, "loop stopped");
            })
            .map_err(|e| ArmError::Channel(format!("failed to spawn {name}: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            handle: Some(handle),
            shutdown,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the loop to stop and wait for the thread to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(worker = %self.name, "loop thread panicked");
        }
    }
}

impl Drop for LoopWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Sleep for `total`, waking every 50 ms to check the shutdown flag so slow
/// loops still stop promptly.
fn sleep_interruptibly(total: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(50);
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || stop.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep((deadline - now).min(SLICE));
    }
}
