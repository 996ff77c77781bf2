//! Foreground window tracking
//!
//! The monitor thread keeps the title of the focused window fresh; the main
//! loop compares it against the target window to pause or resume dispatch.

mod monitor;

use std::sync::Mutex;

pub(crate) use monitor::{refresh, spawn_monitor};

/// Observed foreground window title and the configured target title
#[derive(Debug, Default)]
pub struct FocusState {
    observed: Mutex<Option<String>>,
    target: Option<String>,
}

impl FocusState {
    pub fn new(target: Option<String>) -> Self {
        Self {
            observed: Mutex::new(None),
            target,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Last polled title, `None` until the first successful poll
    pub fn observed(&self) -> Option<String> {
        self.observed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Store a freshly polled title. Returns true if it differs from the last one.
    pub fn update(&self, title: String) -> bool {
        let mut observed = self.observed.lock().unwrap_or_else(|e| e.into_inner());
        if observed.as_deref() == Some(title.as_str()) {
            return false;
        }
        *observed = Some(title);
        true
    }

    /// Whether the focused window is the target
    ///
    /// `None` when no target is set or no title has been observed yet.
    pub fn matches_target(&self) -> Option<bool> {
        let target = self.target.as_deref()?;
        let observed = self.observed.lock().unwrap_or_else(|e| e.into_inner());
        observed.as_deref().map(|title| title == target)
    }
}
