//! OpenAI Realtime API connection.
//!
//! [`OpenAIRealtimeLink::connect`] performs the authenticated WebSocket
//! handshake, configures the session and hands back two halves:
//!
//! - the link itself, a [`RealtimeSender`] that queues client events onto a
//!   dedicated connection task
//! - a [`RealtimeEventStream`] yielding every inbound text frame verbatim
//!
//! The connection task owns the socket. It ends when the server closes, the
//! socket errors, the stream half is dropped, or [`RealtimeSender::close`] is
//! called; in every case the shared liveness flag is cleared first.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, trace, warn};

use super::config::{
    Modality, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel,
    OpenAIRealtimeVoice,
};
use super::messages::{ClientEvent, ConversationItem, SessionConfig, TurnDetection};
use crate::core::realtime::base::{RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSender};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Commands for the connection task; events are serialized by the sender.
enum LinkCommand {
    Frame(String),
    Close,
}

// =============================================================================
// Link
// =============================================================================

/// Handle to a live OpenAI Realtime WebSocket connection.
///
/// Cloning is cheap; all clones feed the same connection task.
#[derive(Clone)]
pub struct OpenAIRealtimeLink {
    commands: mpsc::Sender<LinkCommand>,
    /// Shared with the connection task, cleared when the socket ends
    open: Arc<AtomicBool>,
}

/// Inbound text frames from the AI endpoint. Ends when the connection does.
///
/// Unbounded so the connection task never waits on the relay while the relay
/// waits on the command channel.
pub struct RealtimeEventStream {
    frames: mpsc::UnboundedReceiver<String>,
}

impl Stream for RealtimeEventStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.frames.poll_recv(cx)
    }
}

impl OpenAIRealtimeLink {
    /// Connect, configure the session and optionally trigger the greeting.
    pub async fn connect(
        config: &RealtimeConfig,
    ) -> RealtimeResult<(Self, RealtimeEventStream)> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let request = build_request(config)?;
        let timeout = Duration::from_secs(config.connect_timeout_seconds);

        let (ws_stream, _response) =
            tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    RealtimeError::Timeout(format!(
                        "handshake did not complete within {}s",
                        config.connect_timeout_seconds
                    ))
                })?
                .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<LinkCommand>(WS_CHANNEL_CAPACITY);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();
        let open = Arc::new(AtomicBool::new(true));

        let task_open = open.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = rx.recv() => {
                        match command {
                            Some(LinkCommand::Frame(json)) => {
                                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                    error!("Failed to send WebSocket message: {}", e);
                                    break;
                                }
                            }
                            Some(LinkCommand::Close) | None => {
                                let _ = ws_sink.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }

                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if frame_tx.send(text.as_str().to_owned()).is_err() {
                                    debug!("Inbound consumer gone, closing realtime link");
                                    let _ = ws_sink.send(Message::Close(None)).await;
                                    break;
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("WebSocket closed by server");
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break;
                            }
                            Some(Ok(_)) => {}
                        }
                    }
                }
            }

            task_open.store(false, Ordering::SeqCst);
            debug!("Realtime connection task finished");
        });

        let link = Self { commands: tx, open };

        link.send(session_update(config)).await?;
        if config.greet_first {
            for event in greeting_events(config) {
                link.send(event).await?;
            }
        }

        Ok((link, RealtimeEventStream { frames: frame_rx }))
    }
}

#[async_trait]
impl RealtimeSender for OpenAIRealtimeLink {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        trace!(event_type = event.event_type(), "Sending realtime event");
        let json = serde_json::to_string(&event)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        self.commands
            .send(LinkCommand::Frame(json))
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.commands.send(LinkCommand::Close).await;
        }
    }
}

// =============================================================================
// Handshake and session helpers
// =============================================================================

/// Build the WebSocket URL with model parameter.
pub fn build_ws_url(config: &RealtimeConfig) -> RealtimeResult<String> {
    let base = config.endpoint_url.as_deref().unwrap_or(OPENAI_REALTIME_URL);
    let mut url = url::Url::parse(base)
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("{base}: {e}")))?;
    let model = OpenAIRealtimeModel::from_str_or_default(&config.model);
    url.query_pairs_mut().append_pair("model", model.as_str());
    Ok(url.into())
}

fn build_request(config: &RealtimeConfig) -> RealtimeResult<http::Request<()>> {
    let url = build_ws_url(config)?;
    let mut request = url
        .into_client_request()
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|e| RealtimeError::AuthenticationFailed(e.to_string()))?;
    let headers = request.headers_mut();
    headers.insert(http::header::AUTHORIZATION, bearer);
    headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    Ok(request)
}

/// The `session.update` sent right after the handshake.
pub fn session_update(config: &RealtimeConfig) -> ClientEvent {
    let audio_format = OpenAIRealtimeAudioFormat::from_str_or_default(&config.audio_format);
    let voice = OpenAIRealtimeVoice::from_str_or_default(&config.voice);

    ClientEvent::SessionUpdate {
        session: SessionConfig {
            turn_detection: Some(TurnDetection::server_vad()),
            input_audio_format: Some(audio_format.as_str().to_string()),
            output_audio_format: Some(audio_format.as_str().to_string()),
            voice: Some(voice.as_str().to_string()),
            instructions: Some(config.instructions.clone()),
            modalities: Some(vec![Modality::Text, Modality::Audio]),
            temperature: Some(config.temperature),
        },
    }
}

/// Events that make the assistant speak first.
pub fn greeting_events(config: &RealtimeConfig) -> [ClientEvent; 2] {
    if config.greeting_prompt.is_empty() {
        warn!("greet_first is set with an empty greeting prompt");
    }
    [
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text(config.greeting_prompt.clone()),
        },
        ClientEvent::ResponseCreate,
    ]
}

// =============================================================================
// Tests
// =============================================================================
