use thiserror::Error;

use crate::core::realtime::RealtimeError;

/// Errors raised while relaying one call.
///
/// Whether an error ends the session is decided by [`RelayError::is_fatal`]:
/// a single bad event from the AI endpoint is skipped, anything that breaks
/// the telephony envelope or a transport is not.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Telephony frame that is not a valid media-stream envelope
    #[error("Malformed telephony frame: {0}")]
    MalformedFrame(String),

    /// AI endpoint event that could not be parsed
    #[error("Malformed realtime event: {0}")]
    MalformedEvent(String),

    /// Audio payload that is not valid base64
    #[error("Invalid audio payload: {0}")]
    Codec(#[from] base64::DecodeError),

    /// Telephony writer is gone
    #[error("Telephony connection closed")]
    TelephonyClosed,

    /// Failure on the AI endpoint connection
    #[error("Realtime connection error: {0}")]
    Realtime(#[from] RealtimeError),
}

impl RelayError {
    /// Whether the session must be torn down.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RelayError::MalformedEvent(_) | RelayError::Codec(_))
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
