//! Barge-in handling.
//!
//! When the AI endpoint reports that the caller started speaking while
//! assistant audio is still playing, the assistant item is truncated at the
//! position the caller actually heard and the telephony side drops whatever
//! audio it still has buffered.

use tracing::info;

use super::session::SessionState;
use crate::core::realtime::ClientEvent;
use crate::core::relay::telephony::TelephonyOutgoing;

/// Commands produced by one interruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    pub item_id: String,
    /// Assistant audio the caller heard before speaking, in ms
    pub audio_end_ms: u64,
    pub stream_sid: Option<String>,
}

impl Interruption {
    pub fn truncate_event(&self) -> ClientEvent {
        ClientEvent::ConversationItemTruncate {
            item_id: self.item_id.clone(),
            content_index: 0,
            audio_end_ms: self.audio_end_ms,
        }
    }

    pub fn clear_message(&self) -> Option<TelephonyOutgoing> {
        self.stream_sid.as_deref().map(TelephonyOutgoing::clear)
    }
}

/// React to `input_audio_buffer.speech_started`.
///
/// Requires both an assistant item and a response start time; otherwise the
/// state is left untouched and `None` is returned. On success the marks, the
/// item and the response start are reset.
pub fn on_speech_started(state: &mut SessionState) -> Option<Interruption> {
    let response_start = state.response_start_timestamp?;
    let item_id = state.last_assistant_item.take()?;

    let audio_end_ms = state.latest_media_timestamp.saturating_sub(response_start);
    info!(
        item_id = %item_id,
        audio_end_ms,
        latest_media_timestamp = state.latest_media_timestamp,
        response_start_timestamp = response_start,
        "Interrupting assistant response"
    );

    state.marks.clear();
    state.response_start_timestamp = None;

    Some(Interruption {
        item_id,
        audio_end_ms,
        stream_sid: state.stream_sid.clone(),
    })
}
