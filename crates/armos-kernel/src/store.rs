//! [`SharedStateStore`] – aggregated joint positions plus the fault latch.
//!
//! Both live behind a single [`parking_lot::Mutex`].  The lock is held only to
//! copy or swap the position map and to read or set the latch; no adapter I/O
//! and no sleeping ever happen under it, so hold time is bounded by the number
//! of motors.
//!
//! The position map is replaced wholesale: a reader sees either the previous
//! publish cycle or the new one, never a mix.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use armos_kernel::store::SharedStateStore;
//! use armos_types::JointKey;
//!
//! let store = SharedStateStore::new();
//! let latch = store.fault_latch();
//!
//! store.replace(HashMap::from([(JointKey::new("left", 1), 1200)]));
//! assert_eq!(store.snapshot()[&JointKey::new("left", 1)], 1200);
//!
//! assert!(latch.set("left/1 overcurrent"));
//! assert!(store.get_fault());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use armos_types::JointKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Last observed position, in raw counts, for every (arm, motor).
pub type JointPositions = HashMap<JointKey, i32>;

/// Why and when the latch was tripped.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultRecord {
    pub reason: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    joints: JointPositions,
    fault: Option<FaultRecord>,
}

/// Cloneable handle to the process-wide shared state.
#[derive(Clone, Default)]
pub struct SharedStateStore {
    inner: Arc<Mutex<StoreState>>,
}

impl SharedStateStore {
    /// Create an empty store with the latch cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full copy of the latest joint positions.
    pub fn snapshot(&self) -> JointPositions {
        self.inner.lock().joints.clone()
    }

    /// Atomically replace the whole position map.
    pub fn replace(&self, joints: JointPositions) {
        // Drop the previous map after releasing the lock.
        let _previous = std::mem::replace(&mut self.inner.lock().joints, joints);
    }

    pub fn get_fault(&self) -> bool {
        self.inner.lock().fault.is_some()
    }

    /// Trip the latch.  Returns `true` if this call tripped it.
    pub fn set_fault(&self, reason: impl Into<String>) -> bool {
        self.fault_latch().set(reason)
    }

    /// A handle to the fault latch sharing this store's lock.
    pub fn fault_latch(&self) -> FaultLatch {
        FaultLatch {
            inner: self.inner.clone(),
        }
    }
}

/// One-way fault latch shared by the health monitor and every executor.
///
/// Once set it stays set until [`FaultLatch::reset`] is called by an
/// operator; nothing inside the engine resets it.
#[derive(Clone)]
pub struct FaultLatch {
    inner: Arc<Mutex<StoreState>>,
}

impl FaultLatch {
    /// Trip the latch.  Idempotent: the first reason is kept.
    ///
    /// Returns `true` if this call tripped the latch, `false` if it was
    /// already set.
    pub fn set(&self, reason: impl Into<String>) -> bool {
        let mut state = self.inner.lock();
        if state.fault.is_some() {
            return false;
        }
        state.fault = Some(FaultRecord {
            reason: reason.into(),
            raised_at: Utc::now(),
        });
        true
    }

    pub fn is_set(&self) -> bool {
        self.inner.lock().fault.is_some()
    }

    /// The record of the fault that tripped the latch, if any.
    pub fn record(&self) -> Option<FaultRecord> {
        self.inner.lock().fault.clone()
    }

    /// Operator reset.  Returns the cleared record.
    pub fn reset(&self) -> Option<FaultRecord> {
        self.inner.lock().fault.take()
    }
}
