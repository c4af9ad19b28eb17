//! OpenAI Realtime API module.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview-2024-10-01` - October 2024 version (default)
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_relay::core::realtime::{OpenAIRealtimeLink, RealtimeConfig, RealtimeSender};
//! use futures::StreamExt;
//!
//! let config = RealtimeConfig { api_key: "sk-...".to_string(), ..Default::default() };
//! let (link, mut events) = OpenAIRealtimeLink::connect(&config).await?;
//! while let Some(frame) = events.next().await {
//!     println!("{frame}");
//! }
//! link.close().await;
//! ```

mod client;
mod config;
mod messages;

pub use client::{
    OpenAIRealtimeLink, RealtimeEventStream, build_ws_url, greeting_events, session_update,
};
pub use config::{
    Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice, TELEPHONY_SAMPLE_RATE,
};
pub use messages::{
    ApiError, ClientEvent, ContentPart, ConversationItem, LOGGED_EVENT_TYPES, RateLimit,
    ServerEvent, SessionConfig, TurnDetection,
};
