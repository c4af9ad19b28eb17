//! Media-stream WebSocket handler

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, Stream, StreamExt, future, stream::SplitStream};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::realtime::OpenAIRealtimeLink;
use crate::core::relay::{RelaySession, TelephonyRoute, TelephonySender};
use crate::state::AppState;

/// Outbound frames buffered for the telephony writer
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Upgrade a telephony media-stream request to a WebSocket.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state))
}

async fn handle_media_stream(socket: WebSocket, app_state: Arc<AppState>) {
    let call_id = app_state.register_call();
    info!(
        call_id = %call_id,
        active_calls = app_state.active_calls(),
        "Telephony client connected"
    );

    let (mut sender, receiver) = socket.split();
    let (route_tx, mut route_rx) = mpsc::channel::<TelephonyRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let result = match route {
                TelephonyRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize telephony message: {}", e);
                        continue;
                    }
                },
                TelephonyRoute::Close => {
                    debug!("Closing telephony WebSocket connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                warn!("Failed to send telephony message: {}", e);
                break;
            }
        }
    });

    let realtime_connection = match app_state.config.realtime_config().await {
        Ok(config) => OpenAIRealtimeLink::connect(&config)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };

    match realtime_connection {
        Ok((link, events)) => {
            let session = RelaySession::new(
                &app_state.config.relay_config(),
                Arc::new(link),
                Arc::new(route_tx),
            );

            if let Err(e) = session.run(telephony_text_frames(receiver), events).await {
                debug!(call_id = %call_id, error = %e, "Relay session ended with error");
            }

            info!(
                call_id = %call_id,
                stream_sid = ?session.snapshot().stream_sid,
                "Call finished"
            );
        }
        Err(e) => {
            error!(call_id = %call_id, error = %e, "Failed to connect to realtime endpoint");
            TelephonySender::close(&route_tx).await;
        }
    }

    if let Err(e) = sender_task.await {
        warn!("Telephony sender task failed: {}", e);
    }

    if let Some(call) = app_state.unregister_call(&call_id) {
        info!(
            call_id = %call_id,
            duration_ms = call.connected_at.elapsed().as_millis() as u64,
            active_calls = app_state.active_calls(),
            "Telephony client disconnected"
        );
    }
}

/// Text frames from the telephony socket until it closes or errors.
fn telephony_text_frames(
    receiver: SplitStream<WebSocket>,
) -> impl Stream<Item = String> + Send {
    receiver
        .take_while(|msg| {
            let keep = match msg {
                Ok(Message::Close(_)) => {
                    info!("Telephony client closed the media stream");
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    warn!("Telephony WebSocket error: {}", e);
                    false
                }
            };
            future::ready(keep)
        })
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => {
                    debug!("Ignoring binary telephony frame: {} bytes", data.len());
                    None
                }
                _ => None,
            })
        })
}
