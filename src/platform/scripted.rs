//! Simulated input backend
//!
//! Keys and the focused window title are set from code instead of read from
//! the OS. Used by the test suite and for running profiles headless.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{BackendError, InputBackend};
use crate::keys::KeyCode;

/// In-memory backend whose key and window state is scripted by the caller
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    held: Mutex<HashSet<KeyCode>>,
    title: Mutex<String>,
    fail_title: AtomicBool,
    key_queries: AtomicUsize,
    title_queries: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a key down
    pub fn press(&self, key: KeyCode) {
        self.held_keys().insert(key);
    }

    /// Hold several keys down
    pub fn press_all(&self, keys: impl IntoIterator<Item = KeyCode>) {
        self.held_keys().extend(keys);
    }

    /// Release a key
    pub fn release(&self, key: KeyCode) {
        self.held_keys().remove(&key);
    }

    /// Release every held key
    pub fn release_all(&self) {
        self.held_keys().clear();
    }

    /// Change the title reported for the focused window
    pub fn set_foreground(&self, title: impl Into<String>) {
        *self.title.lock().unwrap_or_else(|e| e.into_inner()) = title.into();
    }

    /// Make window title queries fail until turned off again
    pub fn fail_title_queries(&self, fail: bool) {
        self.fail_title.store(fail, Ordering::SeqCst);
    }

    /// Number of key state queries served so far
    pub fn key_queries(&self) -> usize {
        self.key_queries.load(Ordering::SeqCst)
    }

    /// Number of window title queries served so far
    pub fn title_queries(&self) -> usize {
        self.title_queries.load(Ordering::SeqCst)
    }

    fn held_keys(&self) -> std::sync::MutexGuard<'_, HashSet<KeyCode>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl InputBackend for ScriptedBackend {
    fn is_key_down(&self, key: KeyCode) -> bool {
        self.key_queries.fetch_add(1, Ordering::SeqCst);
        self.held_keys().contains(&key)
    }

    fn foreground_window_title(&self) -> Result<String, BackendError> {
        self.title_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_title.load(Ordering::SeqCst) {
            return Err(BackendError::Os("scripted window query failure".to_string()));
        }
        Ok(self.title.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
