//! Events published by the coordinator
//!
//! State transitions, focus changes and callback failures are broadcast so
//! that callers can log or react to them without polling.

use serde::{Deserialize, Serialize};

use crate::hotkey::HotkeyId;

/// What caused a pause or resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    /// `pause()` / `resume()` called directly
    Manual,
    /// Pause key combination pressed
    PauseKeys,
    /// Focus moved to or away from the target window
    Focus,
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cause::Manual => write!(f, "manual"),
            Cause::PauseKeys => write!(f, "pause keys"),
            Cause::Focus => write!(f, "focus"),
        }
    }
}

/// Events emitted by the coordinator and its loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// Main input loop started
    Started {
        /// Number of bound hotkeys
        hotkeys: usize,
    },

    /// Hotkey dispatch paused
    Paused { cause: Cause },

    /// Hotkey dispatch resumed
    Resumed { cause: Cause },

    /// Coordinator stopped for good
    Stopped,

    /// The focused window title changed
    FocusChanged { title: String },

    /// A hotkey callback returned an error or panicked
    CallbackFailed {
        hotkey: HotkeyId,
        label: String,
        message: String,
    },
}

impl std::fmt::Display for CoordinatorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorEvent::Started { hotkeys } => write!(f, "STARTED ({} hotkeys)", hotkeys),
            CoordinatorEvent::Paused { cause } => write!(f, "PAUSED ({})", cause),
            CoordinatorEvent::Resumed { cause } => write!(f, "RESUMED ({})", cause),
            CoordinatorEvent::Stopped => write!(f, "STOPPED"),
            CoordinatorEvent::FocusChanged { title } => write!(f, "FOCUS_CHANGED ({:?})", title),
            CoordinatorEvent::CallbackFailed { label, message, .. } => {
                write!(f, "CALLBACK_FAILED ({}: {})", label, message)
            }
        }
    }
}
