use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;

/// Bookkeeping for one connected media stream.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub connected_at: Instant,
}

/// Application state shared by all handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Active media-stream connections keyed by connection id
    calls: DashMap<String, CallInfo>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            calls: DashMap::new(),
        })
    }

    /// Register a new media-stream connection and return its id.
    pub fn register_call(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.calls.insert(
            id.clone(),
            CallInfo {
                connected_at: Instant::now(),
            },
        );
        id
    }

    /// Remove a connection, returning what was recorded for it.
    pub fn unregister_call(&self, call_id: &str) -> Option<CallInfo> {
        self.calls.remove(call_id).map(|(_, info)| info)
    }

    pub fn active_calls(&self) -> usize {
        self.calls.len()
    }
}
