//! Realtime speech AI leg of the relay.
//!
//! # Architecture
//!
//! - [`RealtimeSender`] is the write-side seam the relay session talks to
//! - [`OpenAIRealtimeLink`] implements it over the OpenAI Realtime WebSocket
//! - Inbound events reach the session as raw text frames and are parsed into
//!   [`ServerEvent`] there, so a malformed event only costs that one frame
//!
//! # Audio Format
//!
//! G.711 u-law at 8kHz in both directions, matching the telephony leg.

mod base;
pub mod openai;

pub use base::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_GREETING_PROMPT, DEFAULT_INSTRUCTIONS,
    DEFAULT_TEMPERATURE, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSender,
};
pub use openai::{
    ClientEvent, LOGGED_EVENT_TYPES, Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeLink, OpenAIRealtimeModel, OpenAIRealtimeVoice, RealtimeEventStream,
    ServerEvent,
};
