pub mod realtime;
pub mod relay;

// Re-export commonly used types for convenience
pub use realtime::{
    OpenAIRealtimeLink, RealtimeConfig, RealtimeError, RealtimeEventStream, RealtimeResult,
    RealtimeSender,
};

pub use relay::{
    MarkOverflowPolicy, MarkTracker, RelayConfig, RelaySession, SessionState, TelephonyOutgoing,
    TelephonyRoute, TelephonySender,
};
