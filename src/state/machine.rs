//! Core state machine implementation
//!
//! Handles transitions between NotStarted, Running, Paused and Stopped. The
//! state is a single atomic so the main loop, the focus monitor and callers
//! on other threads can all drive it without locks.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::CoordinatorError;
use crate::events::{Cause, CoordinatorEvent};

/// The four possible states of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum State {
    /// Hotkeys may still be bound, no threads running
    #[default]
    NotStarted = 0,
    /// Loops running, hotkeys dispatched
    Running = 1,
    /// Loops running, hotkeys ignored
    Paused = 2,
    /// Terminal, loops wind down
    Stopped = 3,
}

impl State {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => State::NotStarted,
            1 => State::Running,
            2 => State::Paused,
            _ => State::Stopped,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::NotStarted => write!(f, "NotStarted"),
            State::Running => write!(f, "Running"),
            State::Paused => write!(f, "Paused"),
            State::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Lock-free state machine shared by the coordinator and its loops
#[derive(Debug)]
pub struct StateMachine {
    state: AtomicU8,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<CoordinatorEvent>,
}

impl StateMachine {
    /// Create a new state machine in `NotStarted`
    pub fn new(event_tx: broadcast::Sender<CoordinatorEvent>) -> Self {
        Self {
            state: AtomicU8::new(State::NotStarted as u8),
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == State::Stopped
    }

    /// NotStarted -> Running
    pub fn start(&self, hotkeys: usize) -> Result<(), CoordinatorError> {
        self.state
            .compare_exchange(
                State::NotStarted as u8,
                State::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| CoordinatorError::AlreadyStarted)?;

        info!(hotkeys, "state transition: NotStarted -> Running");
        self.emit(CoordinatorEvent::Started { hotkeys });
        Ok(())
    }

    /// Running -> Paused; a no-op when already paused
    pub fn pause(&self, cause: Cause) -> Result<(), CoordinatorError> {
        match self.transition(State::Running, State::Paused)? {
            true => {
                info!(%cause, "state transition: Running -> Paused");
                self.emit(CoordinatorEvent::Paused { cause });
            }
            false => debug!(%cause, "already paused"),
        }
        Ok(())
    }

    /// Paused -> Running; a no-op when already running
    pub fn resume(&self, cause: Cause) -> Result<(), CoordinatorError> {
        match self.transition(State::Paused, State::Running)? {
            true => {
                info!(%cause, "state transition: Paused -> Running");
                self.emit(CoordinatorEvent::Resumed { cause });
            }
            false => debug!(%cause, "already running"),
        }
        Ok(())
    }

    /// Flip between Running and Paused, returning the new state
    pub fn pause_or_resume(&self, cause: Cause) -> Result<State, CoordinatorError> {
        match self.state() {
            State::Running => self.pause(cause)?,
            State::Paused => self.resume(cause)?,
            other => return Err(Self::not_active(other)),
        }
        Ok(self.state())
    }

    /// Move to Stopped from any state. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        let previous = State::from_u8(self.state.swap(State::Stopped as u8, Ordering::AcqRel));
        if previous == State::Stopped {
            return false;
        }

        info!(from = %previous, "state transition: -> Stopped");
        self.emit(CoordinatorEvent::Stopped);
        true
    }

    /// Move `from` -> `to`. Ok(false) when already in `to`.
    fn transition(&self, from: State, to: State) -> Result<bool, CoordinatorError> {
        match self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(true),
            Err(current) => match State::from_u8(current) {
                current if current == to => Ok(false),
                current => Err(Self::not_active(current)),
            },
        }
    }

    fn not_active(state: State) -> CoordinatorError {
        match state {
            State::NotStarted => {
                CoordinatorError::invalid_state("main input loop is not even started")
            }
            State::Stopped => {
                CoordinatorError::invalid_state("main input loop has been stopped forever")
            }
            other => CoordinatorError::invalid_state(format!("unexpected state {other}")),
        }
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_state_machine() -> (StateMachine, broadcast::Receiver<CoordinatorEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (StateMachine::new(tx), rx)
    }

    #[test]
    fn test_initial_state() {
        let (sm, _) = create_state_machine();
        assert_eq!(sm.state(), State::NotStarted);
    }

    #[test]
    fn test_start_once() {
        let (sm, mut rx) = create_state_machine();
        sm.start(2).unwrap();
        assert_eq!(sm.state(), State::Running);
        assert_eq!(rx.try_recv().unwrap(), CoordinatorEvent::Started { hotkeys: 2 });

        assert_eq!(sm.start(2), Err(CoordinatorError::AlreadyStarted));
        assert_eq!(sm.start(2), Err(CoordinatorError::AlreadyStarted));
    }

    #[test]
    fn test_pause_and_resume() {
        let (sm, mut rx) = create_state_machine();
        sm.start(1).unwrap();
        let _ = rx.try_recv();

        sm.pause(Cause::Manual).unwrap();
        assert_eq!(sm.state(), State::Paused);
        assert_eq!(rx.try_recv().unwrap(), CoordinatorEvent::Paused { cause: Cause::Manual });

        // Pausing twice emits nothing new
        sm.pause(Cause::Focus).unwrap();
        assert!(rx.try_recv().is_err());

        sm.resume(Cause::Focus).unwrap();
        assert_eq!(sm.state(), State::Running);
        assert_eq!(rx.try_recv().unwrap(), CoordinatorEvent::Resumed { cause: Cause::Focus });
    }

    #[test]
    fn test_pause_or_resume_toggles() {
        let (sm, _) = create_state_machine();
        sm.start(1).unwrap();
        assert_eq!(sm.pause_or_resume(Cause::PauseKeys).unwrap(), State::Paused);
        assert_eq!(sm.pause_or_resume(Cause::PauseKeys).unwrap(), State::Running);
    }

    #[test]
    fn test_resume_before_start_fails() {
        let (sm, _) = create_state_machine();
        assert!(matches!(
            sm.resume(Cause::Manual),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert!(matches!(
            sm.pause(Cause::Manual),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert!(sm.pause_or_resume(Cause::Manual).is_err());
    }

    #[test]
    fn test_stop_is_terminal() {
        let (sm, mut rx) = create_state_machine();
        sm.start(1).unwrap();
        sm.pause(Cause::Manual).unwrap();
        while rx.try_recv().is_ok() {}

        assert!(sm.stop());
        assert_eq!(rx.try_recv().unwrap(), CoordinatorEvent::Stopped);
        assert!(!sm.stop());
        assert!(rx.try_recv().is_err());

        assert!(matches!(
            sm.resume(Cause::Manual),
            Err(CoordinatorError::InvalidState(_))
        ));
        assert!(sm.pause(Cause::Focus).is_err());
        assert_eq!(sm.start(1), Err(CoordinatorError::AlreadyStarted));
        assert_eq!(sm.state(), State::Stopped);
    }

    #[test]
    fn test_stop_before_start() {
        let (sm, _) = create_state_machine();
        assert!(sm.stop());
        assert!(sm.is_stopped());
    }
}
