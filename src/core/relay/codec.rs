//! Base64 audio envelope shared by both legs.
//!
//! Both sides carry 8kHz G.711 u-law, so relaying a chunk never transcodes.
//! Each direction decodes to validate and re-encodes canonically.

use base64::prelude::*;
use bytes::Bytes;

use crate::errors::RelayResult;

/// Which way a frame travels through the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Caller audio, telephony to AI endpoint
    Inbound,
    /// Assistant audio, AI endpoint to telephony
    Outbound,
}

/// A decoded chunk of G.711 audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub payload: Bytes,
    /// Telephony clock position in ms, known only for inbound frames
    pub timestamp_ms: Option<u64>,
    pub direction: Direction,
}

impl AudioFrame {
    pub fn decode(
        encoded: &str,
        timestamp_ms: Option<u64>,
        direction: Direction,
    ) -> RelayResult<Self> {
        let payload = BASE64_STANDARD.decode(encoded)?;
        Ok(Self {
            payload: Bytes::from(payload),
            timestamp_ms,
            direction,
        })
    }

    pub fn encode(&self) -> String {
        BASE64_STANDARD.encode(&self.payload)
    }

    /// Playback length in ms at 8kHz, one byte per sample.
    pub fn duration_ms(&self) -> u64 {
        self.payload.len() as u64 / 8
    }
}

/// Decode then encode an assistant audio delta for the telephony leg.
pub fn reencode(encoded: &str) -> RelayResult<String> {
    AudioFrame::decode(encoded, None, Direction::Outbound).map(|frame| frame.encode())
}
