//! Duplex relay between a telephony media stream and a realtime speech AI.
//!
//! - [`codec`]: base64 G.711 audio envelope
//! - [`marks`]: playback acknowledgment queue
//! - [`interruption`]: barge-in state transition
//! - [`session`]: per-call pumps and shared state
//! - [`telephony`]: media-stream wire protocol and writer seam

pub mod codec;
pub mod interruption;
pub mod marks;
pub mod session;
pub mod telephony;

pub use codec::{AudioFrame, Direction};
pub use interruption::Interruption;
pub use marks::{
    DEFAULT_MAX_PENDING_MARKS, MarkOverflowPolicy, MarkPush, MarkTracker, RESPONSE_PART_MARK,
};
pub use session::{Leg, Playback, RelaySession, SessionState};
pub use telephony::{TelephonyIncoming, TelephonyOutgoing, TelephonyRoute, TelephonySender};

/// Per-call relay settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Bound on unacknowledged marks; `None` is unbounded
    pub max_pending_marks: Option<usize>,
    pub mark_overflow_policy: MarkOverflowPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_pending_marks: Some(DEFAULT_MAX_PENDING_MARKS),
            mark_overflow_policy: MarkOverflowPolicy::default(),
        }
    }
}
