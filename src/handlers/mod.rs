//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `twiml` - Call-setup document for incoming calls
//! - `media_stream` - Telephony media-stream WebSocket

pub mod api;
pub mod media_stream;
pub mod twiml;

pub use media_stream::media_stream_handler;
