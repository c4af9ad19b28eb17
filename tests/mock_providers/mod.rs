//! Mock provider servers for end-to-end relay tests
//!
//! - WebSocket realtime speech endpoint (OpenAI Realtime wire format)

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod websocket_mock;

pub use websocket_mock::{RealtimeMockServer, RealtimeMockState};
