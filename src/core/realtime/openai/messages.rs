//! OpenAI Realtime API WebSocket message types.
//!
//! Only the subset of the protocol the relay speaks is modelled here.
//!
//! Client events (sent to server):
//! - session.update - Configure voice, formats, VAD and instructions
//! - input_audio_buffer.append - Append caller audio
//! - conversation.item.create - Seed the conversation (greeting)
//! - conversation.item.truncate - Cut an assistant item at the played position
//! - response.create - Ask the assistant to speak
//!
//! Server events (received from server): audio deltas and VAD notifications
//! drive the relay, the rest are observed and logged. Unknown event types
//! deserialize to [`ServerEvent::Other`].

use serde::{Deserialize, Serialize};

use super::config::Modality;

/// Server event types that are logged with their payload when received.
pub const LOGGED_EVENT_TYPES: &[&str] = &[
    "error",
    "response.content.done",
    "rate_limits.updated",
    "response.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
];

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
}

impl TurnDetection {
    /// Server VAD with the provider's default tuning.
    pub fn server_vad() -> Self {
        TurnDetection::ServerVad {
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

impl ConversationItem {
    /// A user message carrying a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.into()),
                transcript: None,
            }]),
        }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Truncate a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item ID
        item_id: String,
        /// Content index
        content_index: u32,
        /// Audio end in ms
        audio_end_ms: u64,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ConversationItemTruncate { .. } => "conversation.item.truncate",
            ClientEvent::ResponseCreate => "response.create",
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
///
/// Fields the relay does not act on are optional so that a provider adding or
/// dropping them never turns a usable event into a parse failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: serde_json::Value,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: serde_json::Value,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: Option<u64>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: Option<u64>,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Conversation item created
    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        #[serde(default)]
        item: Option<ConversationItem>,
    },

    /// Response created
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        response: serde_json::Value,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: serde_json::Value,
    },

    /// Audio delta (audio data chunk)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded audio delta
        delta: String,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Audio done
    #[serde(rename = "response.audio.done")]
    AudioDone {
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Rate limits updated
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        #[serde(default)]
        rate_limits: Vec<RateLimit>,
    },

    /// Any event type the relay does not model.
    #[serde(other)]
    Other,
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// Event ID that caused the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// Rate limit information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimit {
    /// Rate limit name
    pub name: String,
    /// Limit value
    pub limit: u64,
    /// Remaining value
    pub remaining: u64,
    /// Reset timestamp
    pub reset_seconds: f64,
}

// =============================================================================
// Tests
// =============================================================================
