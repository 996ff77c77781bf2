//! State machine module for the coordinator lifecycle
//!
//! Provides an explicit state machine with four states:
//! - NotStarted: hotkeys are being bound, nothing runs yet
//! - Running: hotkeys are dispatched
//! - Paused: loops keep polling but hotkeys are ignored
//! - Stopped: terminal, every loop winds down

mod machine;

pub use machine::{State, StateMachine};
