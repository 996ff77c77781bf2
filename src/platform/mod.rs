//! Operating-system input and window queries
//!
//! The coordinator only needs two point-in-time queries from the OS: whether
//! a key is currently held and the title of the focused window. Both sit
//! behind `InputBackend` so the polling loops can run against a simulated
//! backend as well as the real one.

mod scripted;
#[cfg(windows)]
mod win32;

use std::sync::Arc;

pub use scripted::ScriptedBackend;
#[cfg(windows)]
pub use win32::WindowsBackend;

use crate::keys::KeyCode;

/// Point-in-time key state and foreground window queries
pub trait InputBackend: Send + Sync + 'static {
    /// Whether the key or mouse button is physically down right now
    fn is_key_down(&self, key: KeyCode) -> bool;

    /// Title of the window that currently has focus
    fn foreground_window_title(&self) -> Result<String, BackendError>;
}

/// Errors from the OS query layer
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("no input backend for platform '{0}'")]
    Unsupported(&'static str),

    #[error("OS query failed: {0}")]
    Os(String),
}

/// The backend for the platform this binary was built for
#[cfg(windows)]
pub fn system_backend() -> Result<Arc<dyn InputBackend>, BackendError> {
    Ok(Arc::new(WindowsBackend::new()))
}

/// The backend for the platform this binary was built for
#[cfg(not(windows))]
pub fn system_backend() -> Result<Arc<dyn InputBackend>, BackendError> {
    Err(BackendError::Unsupported(std::env::consts::OS))
}
