//! Shared run state and the stop handle
//!
//! The state is written from two paths: the scheduler loop (start, stop)
//! and whoever requests an early stop (the eventer on a breach, the signal
//! listener on interrupt). Every transition is a single compare-exchange on
//! one atomic, so a reader never sees a half-applied transition and exactly
//! one stop request wins.

use crate::types::StopReason;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::info;

/// Lifecycle of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    StopRequested,
    Stopped,
}

impl RunState {
    fn as_u8(self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::Running => 1,
            RunState::StopRequested => 2,
            RunState::Stopped => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            2 => RunState::StopRequested,
            _ => RunState::Stopped,
        }
    }
}

#[derive(Debug)]
struct RunControl {
    state: AtomicU8,
    reason: Mutex<Option<StopReason>>,
}

/// Cloneable handle onto the run state
#[derive(Clone, Debug)]
pub struct StopHandle {
    inner: Arc<RunControl>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RunControl {
                state: AtomicU8::new(RunState::NotStarted.as_u8()),
                reason: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Ask the run to stop.
    ///
    /// Only the first call made while Running has an effect; it records
    /// `reason` and returns true. Every other call is a no-op.
    pub fn request_stop(&self, reason: StopReason) -> bool {
        // Held across the transition so a reader of `reason()` never sees
        // StopRequested without its reason.
        let mut slot = self.inner.reason.lock();
        if self.transition(RunState::Running, RunState::StopRequested) {
            info!("stop requested: {}", reason);
            *slot = Some(reason);
            true
        } else {
            false
        }
    }

    /// Operator interrupt.
    ///
    /// Unlike [`StopHandle::request_stop`] this also takes effect before
    /// the run starts: the interrupt is held and the run goes straight to
    /// StopRequested once the environment is up. Returns false when a stop
    /// is already in effect or pending.
    pub fn interrupt(&self) -> bool {
        let mut slot = self.inner.reason.lock();
        match self.state() {
            RunState::NotStarted if slot.is_none() => {
                info!("interrupt held until the environment is up");
                *slot = Some(StopReason::Interrupted);
                true
            }
            RunState::Running => {
                if self.transition(RunState::Running, RunState::StopRequested) {
                    info!("stop requested: {}", StopReason::Interrupted);
                    *slot = Some(StopReason::Interrupted);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Reason recorded by the winning stop request or by the deadline
    pub fn reason(&self) -> Option<StopReason> {
        self.inner.reason.lock().clone()
    }

    /// Record the deadline as the stop reason unless one is already set
    pub(crate) fn record_deadline(&self) {
        let mut reason = self.inner.reason.lock();
        if reason.is_none() {
            *reason = Some(StopReason::Deadline);
        }
    }

    /// Leave NotStarted. A held interrupt sends the run straight to
    /// StopRequested.
    pub(crate) fn mark_running(&self) -> bool {
        let slot = self.inner.reason.lock();
        let to = if slot.is_some() {
            RunState::StopRequested
        } else {
            RunState::Running
        };
        self.transition(RunState::NotStarted, to)
    }

    pub(crate) fn mark_stopped(&self) {
        self.inner
            .state
            .store(RunState::Stopped.as_u8(), Ordering::Release);
    }

    fn transition(&self, from: RunState, to: RunState) -> bool {
        self.inner
            .state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
