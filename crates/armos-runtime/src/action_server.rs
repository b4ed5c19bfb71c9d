//! [`ArmActionServer`] – goal / feedback / result surface for one arm.
//!
//! Each server owns one [`TrajectoryExecutor`] running on a dedicated thread
//! that blocks until a goal arrives.  Goals for the same arm execute one at a
//! time in submission order.  Submitting a goal preempts the goal submitted
//! before it, whether that goal is executing or still queued; a goal that is
//! preempted before it starts finishes `Preempted` without moving anything.
//!
//! # Example
//!
//! ```rust,no_run
//! # use armos_runtime::ArmActionServer;
//! # use armos_types::{TrajectoryGoal, Waypoint};
//! # use std::time::Duration;
//! # fn demo(server: &ArmActionServer) -> Result<(), armos_types::ArmError> {
//! let handle = server.send_goal(TrajectoryGoal::new(vec![
//!     Waypoint::new(vec![0, 0, 0], Duration::ZERO),
//!     Waypoint::new(vec![500, 250, 0], Duration::from_secs(1)),
//! ]))?;
//! for feedback in handle.feedback() {
//!     println!("desired {:?}", feedback.desired);
//! }
//! println!("{}", handle.wait()?);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use armos_types::{ArmError, ExecutionOutcome, TrajectoryFeedback, TrajectoryGoal};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::executor::TrajectoryExecutor;
use crate::schedule::PreemptToken;

struct GoalRequest {
    id: Uuid,
    goal: TrajectoryGoal,
    preempt: PreemptToken,
    feedback: Sender<TrajectoryFeedback>,
    result: Sender<ExecutionOutcome>,
}

/// Client-side handle to one submitted goal.
pub struct GoalHandle {
    id: Uuid,
    arm: String,
    preempt: PreemptToken,
    feedback: Receiver<TrajectoryFeedback>,
    result: Receiver<ExecutionOutcome>,
}

impl GoalHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn arm(&self) -> &str {
        &self.arm
    }

    /// Request preemption.  Observed by the executor at its next poll.
    pub fn cancel(&self) {
        self.preempt.request();
    }

    /// Feedback stream; iteration ends when the goal terminates.
    pub fn feedback(&self) -> &Receiver<TrajectoryFeedback> {
        &self.feedback
    }

    /// Block until the goal terminates.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Channel`] if the executor thread went away without
    /// reporting a result.
    pub fn wait(&self) -> Result<ExecutionOutcome, ArmError> {
        self.result
            .recv()
            .map_err(|_| ArmError::Channel(format!("arm {} dropped goal {}", self.arm, self.id)))
    }

    /// Block for at most `timeout`.  `Ok(None)` means the goal is still
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Channel`] if the executor thread went away.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<ExecutionOutcome>, ArmError> {
        match self.result.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ArmError::Channel(format!(
                "arm {} dropped goal {}",
                self.arm, self.id
            ))),
        }
    }

    /// Non-blocking result check.
    pub fn try_result(&self) -> Option<ExecutionOutcome> {
        match self.result.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// One executor thread plus its goal queue.
pub struct ArmActionServer {
    arm: String,
    goals: Option<Sender<GoalRequest>>,
    latest: Arc<Mutex<Option<PreemptToken>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ArmActionServer {
    /// Start the executor thread for `executor`'s arm.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Channel`] if the thread cannot be spawned.
    pub fn start(executor: TrajectoryExecutor) -> Result<Self, ArmError> {
        let arm = executor.arm_id().to_string();
        let (tx, rx) = crossbeam_channel::unbounded::<GoalRequest>();

        let handle = thread::Builder::new()
            .name(format!("executor-{arm}"))
            .spawn(move || serve(executor, rx))
            .map_err(|e| ArmError::Channel(format!("failed to spawn executor for {arm}: {e}")))?;

        Ok(Self {
            arm,
            goals: Some(tx),
            latest: Arc::new(Mutex::new(None)),
            handle: Some(handle),
        })
    }

    pub fn arm(&self) -> &str {
        &self.arm
    }

    /// Queue `goal`, preempting the previously submitted goal.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::Channel`] if the server has been shut down.
    pub fn send_goal(&self, goal: TrajectoryGoal) -> Result<GoalHandle, ArmError> {
        let goals = self
            .goals
            .as_ref()
            .ok_or_else(|| ArmError::Channel(format!("action server for {} is shut down", self.arm)))?;

        let id = Uuid::new_v4();
        let preempt = PreemptToken::new();
        let (feedback_tx, feedback_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);

        if let Some(previous) = self.latest.lock().replace(preempt.clone()) {
            previous.request();
        }

        goals
            .send(GoalRequest {
                id,
                goal,
                preempt: preempt.clone(),
                feedback: feedback_tx,
                result: result_tx,
            })
            .map_err(|_| ArmError::Channel(format!("executor for {} is not running", self.arm)))?;
        debug!(arm = %self.arm, goal_id = %id, "goal queued");

        Ok(GoalHandle {
            id,
            arm: self.arm.clone(),
            preempt,
            feedback: feedback_rx,
            result: result_rx,
        })
    }

    /// Preempt the most recently submitted goal, if any.
    pub fn cancel_all(&self) {
        if let Some(token) = self.latest.lock().as_ref() {
            token.request();
        }
    }

    /// Preempt outstanding goals, close the queue and join the executor.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.cancel_all();
        self.goals.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(arm = %self.arm, "executor thread panicked");
        }
    }
}

impl Drop for ArmActionServer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn serve(executor: TrajectoryExecutor, goals: Receiver<GoalRequest>) {
    info!(arm = %executor.arm_id(), "action server ready");
    for request in goals.iter() {
        let GoalRequest {
            id,
            goal,
            preempt,
            feedback,
            result,
        } = request;
        let outcome = if preempt.is_requested() {
            debug!(arm = %executor.arm_id(), goal_id = %id, "goal preempted before start");
            ExecutionOutcome::Preempted
        } else {
            // A dropped handle only discards feedback; execution continues.
            executor.execute(id, &goal, &preempt, move |fb| {
                let _ = feedback.send(fb);
            })
        };
        info!(arm = %executor.arm_id(), goal_id = %id, %outcome, "goal finished");
        let _ = result.send(outcome);
    }
    debug!(arm = %executor.arm_id(), "action server stopped");
}
