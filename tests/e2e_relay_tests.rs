//! End-to-end relay tests
//!
//! Runs the full server on an ephemeral port, points it at a mock realtime
//! endpoint and drives it with a WebSocket client speaking the telephony
//! media-stream protocol.

mod mock_providers;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use mock_providers::RealtimeMockServer;
use waav_relay::{
    ServerConfig, build_router,
    config::{DEFAULT_CONNECT_PROMPT, DEFAULT_READY_PROMPT},
    core::relay::MarkOverflowPolicy,
    state::AppState,
};

const WAIT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn relay_config(realtime_url: String, greet_first: bool) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        public_host: None,
        openai_api_key: Some("sk-e2e".to_string()),
        openai_realtime_url: Some(realtime_url),
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        realtime_voice: "alloy".to_string(),
        system_instructions: "You are a test assistant.".to_string(),
        system_knowledge_path: None,
        temperature: 0.8,
        greet_first,
        greeting_prompt: "Say hello.".to_string(),
        connect_timeout_seconds: 5,
        max_pending_marks: 1024,
        mark_overflow_policy: MarkOverflowPolicy::DropOldest,
        connect_prompt: DEFAULT_CONNECT_PROMPT.to_string(),
        ready_prompt: DEFAULT_READY_PROMPT.to_string(),
    }
}

async fn start_relay(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(AppState::new(config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect_telephony(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/media-stream"))
        .await
        .unwrap();
    client
}

async fn send_json(client: &mut Client, value: Value) {
    client
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

/// Next JSON text frame, or `None` when the server closes.
async fn next_json(client: &mut Client) -> Option<Value> {
    loop {
        match timeout(WAIT, client.next()).await.ok()?? {
            Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

fn start_frame(stream_sid: &str) -> Value {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "streamSid": stream_sid,
        "start": {
            "streamSid": stream_sid,
            "accountSid": "AC1",
            "callSid": "CA1",
            "tracks": ["inbound"],
            "customParameters": {},
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        }
    })
}

fn media_frame(stream_sid: &str, timestamp: u64) -> Value {
    json!({
        "event": "media",
        "sequenceNumber": "2",
        "streamSid": stream_sid,
        "media": {"track": "inbound", "chunk": "1", "timestamp": timestamp.to_string(), "payload": "f39/fw=="}
    })
}

#[tokio::test]
async fn test_full_call_with_barge_in() {
    let mock = RealtimeMockServer::start(vec![
        Some(json!({
            "type": "response.audio.delta",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "content_index": 0,
            "delta": "AAEC"
        })),
        Some(json!({
            "type": "input_audio_buffer.speech_started",
            "audio_start_ms": 1300,
            "item_id": "item_user"
        })),
    ])
    .await;
    let addr = start_relay(relay_config(mock.url(), false)).await;
    let mut client = connect_telephony(addr).await;

    send_json(&mut client, json!({"event": "connected", "protocol": "Call", "version": "1.0.0"})).await;
    send_json(&mut client, start_frame("MZ-e2e")).await;
    send_json(&mut client, media_frame("MZ-e2e", 100)).await;

    // Assistant audio and its playback mark
    let media = next_json(&mut client).await.unwrap();
    assert_eq!(media["event"], "media");
    assert_eq!(media["streamSid"], "MZ-e2e");
    assert_eq!(media["media"]["payload"], "AAEC");

    let mark = next_json(&mut client).await.unwrap();
    assert_eq!(mark, json!({"event": "mark", "streamSid": "MZ-e2e", "mark": {"name": "responsePart"}}));

    // Caller speaks 1200 ms into the reply
    send_json(&mut client, media_frame("MZ-e2e", 1300)).await;

    let clear = next_json(&mut client).await.unwrap();
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ-e2e"}));

    let truncate = mock
        .state
        .wait_for("conversation.item.truncate", WAIT)
        .await
        .unwrap();
    assert_eq!(truncate["item_id"], "item_1");
    assert_eq!(truncate["content_index"], 0);
    assert_eq!(truncate["audio_end_ms"], 1200);

    // Handshake and session configuration
    assert_eq!(mock.state.authorization.lock().as_deref(), Some("Bearer sk-e2e"));
    assert_eq!(mock.state.beta_header.lock().as_deref(), Some("realtime=v1"));
    assert!(
        mock.state
            .request_uri
            .lock()
            .as_deref()
            .unwrap()
            .contains("model=gpt-4o-realtime-preview-2024-10-01")
    );

    let types = mock.state.event_types();
    assert_eq!(types[0], "session.update");
    assert_eq!(
        types.iter().filter(|t| *t == "input_audio_buffer.append").count(),
        2
    );

    let update = &mock.state.events_of("session.update")[0];
    assert_eq!(update["session"]["input_audio_format"], "g711_ulaw");
    assert_eq!(update["session"]["output_audio_format"], "g711_ulaw");
    assert_eq!(update["session"]["turn_detection"]["type"], "server_vad");
    assert_eq!(update["session"]["instructions"], "You are a test assistant.");

    let append = &mock.state.events_of("input_audio_buffer.append")[0];
    assert_eq!(append["audio"], "f39/fw==");

    client.close(None).await.unwrap();
}

#[tokio::test]
async fn test_greet_first_sends_greeting() {
    let mock = RealtimeMockServer::start(Vec::new()).await;
    let addr = start_relay(relay_config(mock.url(), true)).await;
    let mut client = connect_telephony(addr).await;
    send_json(&mut client, start_frame("MZ-greet")).await;

    mock.state
        .wait_for("response.create", WAIT)
        .await
        .unwrap();

    let types = mock.state.event_types();
    assert_eq!(
        &types[..3],
        &["session.update", "conversation.item.create", "response.create"]
    );

    let item = &mock.state.events_of("conversation.item.create")[0];
    assert_eq!(item["item"]["role"], "user");
    assert_eq!(item["item"]["content"][0]["type"], "input_text");
    assert_eq!(item["item"]["content"][0]["text"], "Say hello.");

    client.close(None).await.unwrap();
}

#[tokio::test]
async fn test_telephony_closed_when_realtime_unreachable() {
    // Reserve a port, then free it so nothing is listening
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("ws://{}", unused.local_addr().unwrap());
    drop(unused);

    let addr = start_relay(relay_config(dead_url, false)).await;
    let mut client = connect_telephony(addr).await;

    assert!(next_json(&mut client).await.is_none());
}

#[tokio::test]
async fn test_realtime_closed_when_telephony_hangs_up() {
    let mock = RealtimeMockServer::start(Vec::new()).await;
    let addr = start_relay(relay_config(mock.url(), false)).await;
    let mut client = connect_telephony(addr).await;

    send_json(&mut client, start_frame("MZ-bye")).await;
    mock.state.wait_for("session.update", WAIT).await.unwrap();

    send_json(&mut client, json!({"event": "stop", "streamSid": "MZ-bye", "stop": {}})).await;
    client.close(None).await.unwrap();

    assert!(mock.state.wait_for_disconnect(WAIT).await);
}

#[tokio::test]
async fn test_hang_up_ends_call_during_two_way_burst() {
    // The first append unleashes a long reply with a barge-in every 50 deltas
    let flood: Vec<Value> = (0..600)
        .map(|i| {
            if i % 50 == 49 {
                json!({
                    "type": "input_audio_buffer.speech_started",
                    "audio_start_ms": i,
                    "item_id": "item_user"
                })
            } else {
                json!({
                    "type": "response.audio.delta",
                    "response_id": "resp_burst",
                    "item_id": format!("item_{}", i / 50),
                    "output_index": 0,
                    "content_index": 0,
                    "delta": "AAEC"
                })
            }
        })
        .collect();
    let mock = RealtimeMockServer::start_batches(vec![flood]).await;
    let addr = start_relay(relay_config(mock.url(), false)).await;
    let client = connect_telephony(addr).await;
    let (mut write, mut read) = client.split();

    let reader = tokio::spawn(async move {
        let mut frames = 0usize;
        while let Some(Ok(msg)) = read.next().await {
            if msg.is_text() {
                frames += 1;
            }
        }
        frames
    });

    write
        .send(Message::Text(start_frame("MZ-burst").to_string().into()))
        .await
        .unwrap();
    for timestamp in 0..1500 {
        let frame = media_frame("MZ-burst", timestamp * 20);
        write
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    mock.state
        .wait_for("conversation.item.truncate", WAIT)
        .await
        .expect("barge-in reached the realtime side");

    write.send(Message::Close(None)).await.unwrap();

    assert!(mock.state.wait_for_disconnect(WAIT).await);
    let frames = timeout(WAIT, reader)
        .await
        .expect("relay closed the telephony side")
        .unwrap();
    assert!(frames > 0);
}
