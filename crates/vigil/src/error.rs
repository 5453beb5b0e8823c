//! Session host errors.

use thiserror::Error;
use vigil_core::CoreError;

/// Errors raised while setting up or exporting a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration or audit log problem.
    #[error("engine error: {0}")]
    Core(#[from] CoreError),

    /// File or stream problem outside the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session was destroyed and accepts no more signals.
    #[error("session {exam_id} has been destroyed")]
    Destroyed {
        /// Exam the session belonged to.
        exam_id: String,
    },
}

/// Result type for host operations.
pub type SessionResult<T> = Result<T, SessionError>;
