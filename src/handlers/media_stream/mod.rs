//! Telephony media-stream WebSocket
//!
//! Each connection is one call. The handler connects to the realtime AI
//! endpoint and runs a [`RelaySession`](crate::core::relay::RelaySession)
//! between the two until either side goes away.
//!
//! ## Telephony → Server
//!
//! - **connected**, **stop**, **dtmf**: ignored
//! - **start**: carries the `streamSid` used on every outbound frame
//! - **media**: base64 G.711 u-law caller audio with a millisecond timestamp
//! - **mark**: playback acknowledgment
//!
//! ## Server → Telephony
//!
//! - **media**: assistant audio
//! - **mark**: `responsePart`, sent after every audio chunk
//! - **clear**: drop buffered audio after a barge-in

mod handler;

pub use handler::media_stream_handler;
