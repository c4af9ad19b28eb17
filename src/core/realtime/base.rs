//! Base traits and types for the realtime speech AI leg.
//!
//! The relay only needs to push client events at the AI endpoint and know
//! whether that connection is still alive; inbound events are consumed as a
//! stream of raw text frames by the relay session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::openai::ClientEvent;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Default connect timeout for the AI endpoint handshake.
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default system instructions for the assistant.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful and bubbly AI assistant who loves to \
chat about anything the user is interested in and is prepared to offer them facts. Always stay \
positive, but work in a joke when appropriate.";

/// Default prompt used when the assistant speaks first.
pub const DEFAULT_GREETING_PROMPT: &str =
    "Greet the user with \"Hello there! How can I help you today?\"";

/// Per-call configuration for the AI endpoint connection.
///
/// Built once from the server configuration and handed to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    pub model: String,

    /// Voice for audio output
    pub voice: String,

    /// System instructions for the assistant
    pub instructions: String,

    /// Temperature for response generation
    pub temperature: f32,

    /// Audio format on both directions of the AI leg
    pub audio_format: String,

    /// Whether the assistant speaks before the caller does
    pub greet_first: bool,

    /// Prompt sent as the first user item when `greet_first` is set
    pub greeting_prompt: String,

    /// Handshake timeout
    pub connect_timeout_seconds: u64,

    /// Endpoint override; `None` uses the provider's public endpoint
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
            voice: "alloy".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            audio_format: "g711_ulaw".to_string(),
            greet_first: false,
            greeting_prompt: DEFAULT_GREETING_PROMPT.to_string(),
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            endpoint_url: None,
        }
    }
}

// =============================================================================
// Connection Trait
// =============================================================================

/// Write side of a connection to a realtime speech AI endpoint.
///
/// Implementations must be cheap to share between the two relay pumps.
#[async_trait]
pub trait RealtimeSender: Send + Sync {
    /// Whether the connection is still usable. Checked before every send.
    fn is_open(&self) -> bool;

    /// Queue a client event for delivery.
    async fn send(&self, event: ClientEvent) -> RealtimeResult<()>;

    /// Close the connection. Idempotent.
    async fn close(&self);
}
