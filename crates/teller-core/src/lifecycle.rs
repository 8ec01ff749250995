//! One-shot start/stop state machine.
//!
//! A [`Lifecycle`] moves through `Unstarted → Started → Stopped` using a
//! single atomic compare-and-swap per transition, so concurrent callers can
//! never both win a `start()` or both win a `stop()`. `Stopped` is terminal.
//!
//! Components own the resource they guard separately: they win the
//! transition first and only then build (or tear down) the resource. If
//! building fails, [`Lifecycle::abort_start`] rolls the state back to
//! `Unstarted` so a later `start()` can retry.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

const UNSTARTED: u8 = 0;
const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// Errors from an invalid lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `start()` was called on a component that is already running.
    #[error("{0} already started")]
    AlreadyStarted(&'static str),

    /// `stop()` was called on a component that is not running, or
    /// `start()` was called after the component was stopped.
    #[error("{0} already stopped")]
    AlreadyStopped(&'static str),
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never started (or a start attempt was aborted).
    Unstarted,
    /// Running.
    Started,
    /// Stopped for good.
    Stopped,
}

/// Atomic one-shot lifecycle guard.
pub struct Lifecycle {
    name: &'static str,
    state: AtomicU8,
}

impl Lifecycle {
    /// Create a new lifecycle in the `Unstarted` state.
    ///
    /// `name` identifies the component in error messages.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(UNSTARTED),
        }
    }

    /// Transition `Unstarted → Started`.
    pub fn start(&self) -> Result<(), LifecycleError> {
        match self
            .state
            .compare_exchange(UNSTARTED, STARTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(STARTED) => Err(LifecycleError::AlreadyStarted(self.name)),
            Err(_) => Err(LifecycleError::AlreadyStopped(self.name)),
        }
    }

    /// Transition `Started → Stopped`.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        self.state
            .compare_exchange(STARTED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| LifecycleError::AlreadyStopped(self.name))
    }

    /// Roll a won `start()` back to `Unstarted` after start-up work failed.
    ///
    /// No-op unless the state is currently `Started`.
    pub fn abort_start(&self) {
        let _ = self
            .state
            .compare_exchange(STARTED, UNSTARTED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        match self.state.load(Ordering::Acquire) {
            UNSTARTED => LifecycleState::Unstarted,
            STARTED => LifecycleState::Started,
            _ => LifecycleState::Stopped,
        }
    }

    /// Whether the component is currently `Started`.
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Started
    }

    /// Component name used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
