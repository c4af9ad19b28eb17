//! Telephony media-stream wire protocol.
//!
//! JSON text frames tagged by `event`. The relay reads `start`, `media` and
//! `mark`; everything else is accepted and ignored. It writes `media`, `mark`
//! and `clear`.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;

use crate::errors::{RelayError, RelayResult};

// =============================================================================
// Inbound
// =============================================================================

/// Frames received from the telephony side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyIncoming {
    Connected,
    Start { start: StartMetadata },
    Media { media: MediaPayload },
    Mark { mark: MarkName },
    Stop,
    Dtmf,
    #[serde(other)]
    Other,
}

/// Body of a `start` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
    #[serde(default)]
    pub custom_parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub channels: Option<u32>,
}

/// Body of an inbound `media` frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Telephony clock in ms since the stream started
    #[serde(deserialize_with = "timestamp_ms")]
    pub timestamp: u64,
    /// Base64 G.711 u-law
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkName {
    pub name: String,
}

/// Media timestamps arrive as numbers or as decimal strings.
fn timestamp_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Str(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{text}': {e}"))),
    }
}

impl TelephonyIncoming {
    pub fn parse(text: &str) -> RelayResult<Self> {
        serde_json::from_str(text).map_err(|e| RelayError::MalformedFrame(e.to_string()))
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Frames sent to the telephony side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutgoing {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkName,
    },
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl TelephonyOutgoing {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkName { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        Self::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}

// =============================================================================
// Writer seam
// =============================================================================

/// Messages routed to the telephony writer task.
#[derive(Debug)]
pub enum TelephonyRoute {
    Outgoing(TelephonyOutgoing),
    Close,
}

/// Write side of the telephony connection.
#[async_trait]
pub trait TelephonySender: Send + Sync {
    async fn send(&self, message: TelephonyOutgoing) -> RelayResult<()>;

    async fn close(&self);
}

#[async_trait]
impl TelephonySender for mpsc::Sender<TelephonyRoute> {
    async fn send(&self, message: TelephonyOutgoing) -> RelayResult<()> {
        mpsc::Sender::send(self, TelephonyRoute::Outgoing(message))
            .await
            .map_err(|_| RelayError::TelephonyClosed)
    }

    async fn close(&self) {
        let _ = mpsc::Sender::send(self, TelephonyRoute::Close).await;
    }
}
