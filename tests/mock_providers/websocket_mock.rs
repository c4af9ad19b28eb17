//! WebSocket Mock Server for the realtime speech endpoint
//!
//! Records every client event and replies to the n-th
//! `input_audio_buffer.append` with the n-th scripted batch of events.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

/// Shared recording of what clients sent.
#[derive(Default)]
pub struct RealtimeMockState {
    pub events: Mutex<Vec<Value>>,
    pub authorization: Mutex<Option<String>>,
    pub beta_header: Mutex<Option<String>>,
    pub request_uri: Mutex<Option<String>>,
    pub connection_count: AtomicU64,
    pub closed_count: AtomicU64,
}

impl RealtimeMockState {
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e["type"].as_str().map(str::to_string))
            .collect()
    }

    pub fn events_of(&self, event_type: &str) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|e| e["type"] == event_type)
            .cloned()
            .collect()
    }

    /// Poll until a client connection has ended.
    pub async fn wait_for_disconnect(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.closed_count.load(Ordering::Relaxed) == 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Poll until an event of the given type has arrived.
    pub async fn wait_for(&self, event_type: &str, timeout: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(event) = self.events_of(event_type).into_iter().next() {
                return Some(event);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub struct RealtimeMockServer {
    pub addr: SocketAddr,
    pub state: Arc<RealtimeMockState>,
}

impl RealtimeMockServer {
    /// Start a mock on an ephemeral port.
    ///
    /// `replies[n]` is sent after the (n+1)-th audio append, if present.
    pub async fn start(replies: Vec<Option<Value>>) -> Self {
        let batches = replies
            .into_iter()
            .map(|reply| reply.into_iter().collect())
            .collect();
        Self::start_batches(batches).await
    }

    /// Like [`start`](Self::start), but each append may trigger many events.
    pub async fn start_batches(replies: Vec<Vec<Value>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(RealtimeMockState::default());
        let replies = Arc::new(replies);

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                let replies = replies.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state.clone(), replies).await {
                        eprintln!("Realtime mock connection error: {e}");
                    }
                    state.closed_count.fetch_add(1, Ordering::Relaxed);
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<RealtimeMockState>,
    replies: Arc<Vec<Vec<Value>>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let header_state = state.clone();
    let ws_stream = accept_hdr_async(stream, move |request: &Request, response: Response| {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        *header_state.authorization.lock() = header("authorization");
        *header_state.beta_header.lock() = header("openai-beta");
        *header_state.request_uri.lock() = Some(request.uri().to_string());
        Ok(response)
    })
    .await?;

    state.connection_count.fetch_add(1, Ordering::Relaxed);
    let (mut write, mut read) = ws_stream.split();

    let created = json!({"type": "session.created", "session": {"id": "sess_mock"}});
    write.send(Message::Text(created.to_string().into())).await?;

    let mut appends = 0usize;
    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(text.as_str())?;
                let is_append = value["type"] == "input_audio_buffer.append";
                state.events.lock().push(value);

                if is_append {
                    for reply in replies.get(appends).into_iter().flatten() {
                        write.send(Message::Text(reply.to_string().into())).await?;
                    }
                    appends += 1;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
