//! Call-setup document for the telephony provider.
//!
//! The provider fetches this when a call arrives; it plays two prompts and then
//! opens a media stream back to `/media-stream` on this server.

use axum::{
    extract::State,
    http::{HeaderMap, header, uri::Authority},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Path the media stream connects back to.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Answer an incoming call with TwiML that connects it to the media stream.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let host = resolve_host(state.config.public_host.as_deref(), &headers)?;
    info!(host = %host, "Answering incoming call");

    let body = render(
        &state.config.connect_prompt,
        &state.config.ready_prompt,
        &host,
    );
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}

/// Configured public host wins over the request's `Host` header.
///
/// The header's port is dropped: the stream URL is `wss://` on the default
/// port, which is where a tunnel or proxy in front of the server listens.
fn resolve_host(public_host: Option<&str>, headers: &HeaderMap) -> AppResult<String> {
    if let Some(host) = public_host.map(str::trim).filter(|h| !h.is_empty()) {
        return Ok(host.to_string());
    }

    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<Authority>().ok())
        .map(|authority| authority.host().to_string())
        .filter(|h| !h.is_empty())
        .ok_or(AppError::MissingHost)
}

pub fn render(connect_prompt: &str, ready_prompt: &str, host: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<Response>\
<Say>{}</Say>\
<Pause length=\"1\"/>\
<Say>{}</Say>\
<Connect><Stream url=\"wss://{}{MEDIA_STREAM_PATH}\"/></Connect>\
</Response>",
        escape_xml(connect_prompt),
        escape_xml(ready_prompt),
        escape_xml(host),
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
