//! Error types raised synchronously by coordinator operations

/// Errors that can occur when configuring or controlling the coordinator
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("main input loop has already been started once, if it is paused try resume()")]
    AlreadyStarted,

    #[error("no hotkeys bound, cannot start main input loop")]
    NoHotkeysRegistered,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(String),
}

impl CoordinatorError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
