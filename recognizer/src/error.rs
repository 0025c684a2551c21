use serde::Serialize;
use thiserror::Error;

/// Coarse error classification carried on host-facing error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    MissingReference,
    StorageFailure,
    SessionActive,
}

/// Errors crossing the engine boundary.
///
/// Malformed frames inside the streaming path are recovered locally (treated
/// as silence) and never surface here.
#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no usable reference named {name:?}")]
    MissingReference { name: String },

    #[error("storage failure for {name:?}: {reason}")]
    StorageFailure { name: String, reason: String },

    #[error("another audio session is active")]
    SessionActive,
}

impl RecognizerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecognizerError::InvalidInput(_) => ErrorKind::InvalidInput,
            RecognizerError::MissingReference { .. } => ErrorKind::MissingReference,
            RecognizerError::StorageFailure { .. } => ErrorKind::StorageFailure,
            RecognizerError::SessionActive => ErrorKind::SessionActive,
        }
    }
}
