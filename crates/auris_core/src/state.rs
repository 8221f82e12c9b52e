//! The state lock: a small `Mutex<State>` + `Condvar` building block shared
//! by every stage that implements `Controllable`.
//!
//! Kept deliberately separate from any per-stage data lock (buffers,
//! device handles) so that a caller can hold the state lock just long
//! enough to read or flip `State`, release it, and only then touch data -
//! the ordering discipline spelled out for the recorder and the playback
//! pump: never hold a state lock across a sibling's state lock.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::frame::State;

/// Owns one stage's `State` plus the condvar that wakes waiters on every
/// transition.
pub struct StateCell {
    state: Mutex<State>,
    cv: Condvar,
}

impl StateCell {
    pub fn new(initial: State) -> Self {
        Self {
            state: Mutex::new(initial),
            cv: Condvar::new(),
        }
    }

    /// Current state. Short-lived lock, does not block on anything else.
    pub fn get(&self) -> State {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Locks and returns the guard, for callers that need to read-then-act
    /// without the value changing underneath them (the playback pump's
    /// per-iteration dispatch does this).
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets a new state and wakes every waiter. A no-op transition still
    /// notifies: callers that are waiting on a predicate re-check it
    /// regardless.
    pub fn set(&self, new_state: State) {
        let mut guard = self.lock();
        *guard = new_state;
        drop(guard);
        self.cv.notify_all();
    }

    /// Blocks until the state is anything other than `Stopped`. A
    /// predicate loop, not a single wait: spurious wakeups and
    /// `notify_all` calls from unrelated transitions must not let this
    /// return early on a state that is still `Stopped`.
    pub fn wait_active(&self) {
        let guard = self.lock();
        let _guard = self
            .cv
            .wait_while(guard, |s| matches!(s, State::Stopped))
            .unwrap_or_else(|e| e.into_inner());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_active_returns_immediately_when_already_active() {
        let cell = StateCell::new(State::Active);
        cell.wait_active();
    }

    #[test]
    fn wait_active_blocks_until_transition_to_active() {
        let cell = Arc::new(StateCell::new(State::Stopped));
        let cell2 = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            cell2.wait_active();
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        cell.set(State::Active);
        handle.join().unwrap();
    }

    #[test]
    fn wait_active_does_not_wake_on_unrelated_notify_while_still_stopped() {
        let cell = Arc::new(StateCell::new(State::Stopped));
        let cell2 = Arc::clone(&cell);
        let handle = thread::spawn(move || {
            cell2.wait_active();
        });
        thread::sleep(Duration::from_millis(10));
        cell.set(State::Stopped);
        thread::sleep(Duration::from_millis(10));
        assert!(!handle.is_finished());
        cell.set(State::Active);
        handle.join().unwrap();
    }
}
