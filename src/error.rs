//! Error types for the voice control session.

/// Top-level error type for the voice control system.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The recognition engine rejected a request.
    #[error("engine error: {0}")]
    Engine(String),

    /// A session lifecycle call was made in a state that does not allow it.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle calls rejected by [`crate::session::SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// `create_recognizer` has not been called yet.
    #[error("recognizer has not been created")]
    NotInitialized,

    /// `create_recognizer` was called twice.
    #[error("recognizer already created")]
    AlreadyCreated,

    /// Speech recognition is not available on this device.
    #[error("speech recognition is unavailable")]
    Unavailable,

    /// The recognizer was destroyed; no further calls are legal.
    #[error("recognizer destroyed")]
    Destroyed,
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VoiceError>;
