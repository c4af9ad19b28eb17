//! HTTP route tests
//!
//! Exercise the router in-process with `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use waav_relay::{
    ServerConfig, build_router,
    config::{DEFAULT_CONNECT_PROMPT, DEFAULT_READY_PROMPT},
    core::relay::MarkOverflowPolicy,
    state::AppState,
};

fn create_test_config(public_host: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 5050,
        tls: None,
        public_host: public_host.map(str::to_string),
        openai_api_key: Some("sk-test".to_string()),
        openai_realtime_url: None,
        realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
        realtime_voice: "alloy".to_string(),
        system_instructions: "Be brief.".to_string(),
        system_knowledge_path: None,
        temperature: 0.8,
        greet_first: false,
        greeting_prompt: "Say hello.".to_string(),
        connect_timeout_seconds: 10,
        max_pending_marks: 1024,
        mark_overflow_policy: MarkOverflowPolicy::DropOldest,
        connect_prompt: DEFAULT_CONNECT_PROMPT.to_string(),
        ready_prompt: DEFAULT_READY_PROMPT.to_string(),
    }
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");

    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, serde_json::json!({"message": "Media stream relay is running!"}));
}

#[tokio::test]
async fn test_incoming_call_uses_host_header() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "abc123.ngrok.app")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("CallSid=CA1&From=%2B15550001"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );

    let xml = body_string(response).await;
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
    assert!(xml.contains("<Pause length=\"1\"/>"));
    assert!(xml.contains("<Say>O.K. you can start talking!</Say>"));
    assert!(xml.contains("<Stream url=\"wss://abc123.ngrok.app/media-stream\"/>"));
    assert!(xml.ends_with("</Connect></Response>"));
}

#[tokio::test]
async fn test_incoming_call_get_prefers_public_host() {
    let app = build_router(AppState::new(create_test_config(Some("relay.example.com"))));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/incoming-call")
                .header(header::HOST, "10.0.0.5:5050")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains("wss://relay.example.com/media-stream"));
    assert!(!xml.contains("10.0.0.5"));
}

#[tokio::test]
async fn test_incoming_call_drops_host_header_port() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/incoming-call")
                .header(header::HOST, "relay.internal:5050")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let xml = body_string(response).await;
    assert!(xml.contains("<Stream url=\"wss://relay.internal/media-stream\"/>"));
    assert!(!xml.contains(":5050"));
}

#[tokio::test]
async fn test_incoming_call_without_host_is_rejected() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/incoming-call")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].as_str().unwrap().contains("public host"));
}

#[tokio::test]
async fn test_media_stream_requires_upgrade() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/media-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route() {
    let app = build_router(AppState::new(create_test_config(None)));

    let response = app
        .oneshot(Request::builder().uri("/voices").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
