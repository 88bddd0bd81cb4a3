//! Orchestration session tracking.
//!
//! At most one session (bulk upgrade, essentials install, manual check) is
//! active at a time. A session is represented by an RAII [`SessionHandle`]:
//! progress events flow through [`SessionHandle::advance`], and the terminal
//! `-1` sentinel is emitted exactly once, on `finish()` or on drop, so an
//! early abort through `?` still releases the session.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::EngineError;
use super::events::{EngineEvent, EventBus};
use super::types::{ProgressState, TERMINAL_PROGRESS};

/// Tracks the single active session and publishes its progress events.
#[derive(Debug)]
pub struct SessionTracker {
    state: Mutex<ProgressState>,
    events: EventBus,
}

impl SessionTracker {
    /// Creates an idle tracker publishing on the given bus.
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Mutex::new(ProgressState::idle()),
            events,
        }
    }

    /// Starts a new session.
    ///
    /// Fails fast with [`EngineError::Busy`] when a session is already
    /// active, without touching the active session's state or emitting any
    /// event for it. On success the initial `(0, total)` progress event is
    /// published.
    pub fn begin(&self, name: &str, total: i64) -> Result<SessionHandle<'_>, EngineError> {
        {
            let mut state = self.lock_state();
            if state.in_progress {
                return Err(EngineError::Busy(state.name.clone()));
            }
            *state = ProgressState {
                name: name.to_string(),
                in_progress: true,
                progress: 0,
                total,
            };
        }

        debug!(session = name, total, "session started");
        self.events.emit(EngineEvent::UpdateProgress { progress: 0, total });

        Ok(SessionHandle {
            tracker: self,
            total,
            done: false,
        })
    }

    /// Returns true while a session is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_state().in_progress
    }

    /// Returns a copy of the current session state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.lock_state().clone()
    }

    fn advance(&self, progress: i64) {
        let total = {
            let mut state = self.lock_state();
            if !state.in_progress {
                warn!(progress, "progress reported outside a session, dropped");
                return;
            }
            if progress < state.progress {
                warn!(
                    progress,
                    current = state.progress,
                    "non-monotonic progress dropped"
                );
                return;
            }
            state.progress = progress;
            state.total
        };
        self.events.emit(EngineEvent::UpdateProgress { progress, total });
    }

    fn release(&self, total: i64) {
        {
            let mut state = self.lock_state();
            debug!(session = %state.name, "session released");
            *state = ProgressState::idle();
        }
        self.events.emit(EngineEvent::UpdateProgress {
            progress: TERMINAL_PROGRESS,
            total,
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the active session.
///
/// Dropping the handle releases the session and emits the terminal
/// sentinel if `finish()` was not called.
#[derive(Debug)]
pub struct SessionHandle<'a> {
    tracker: &'a SessionTracker,
    total: i64,
    done: bool,
}

impl SessionHandle<'_> {
    /// Publishes a progress event for the session.
    ///
    /// Progress must be monotonic; a regressing value is logged and
    /// dropped, never emitted.
    pub fn advance(&mut self, progress: i64) {
        self.tracker.advance(progress);
    }

    /// Completes the session, emitting the terminal sentinel.
    pub fn finish(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if !self.done {
            self.done = true;
            self.tracker.release(self.total);
        }
    }
}

impl Drop for SessionHandle<'_> {
    fn drop(&mut self) {
        self.terminate();
    }
}
