//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::handlers::twiml::MEDIA_STREAM_PATH;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for one telephony call
///
/// The telephony provider opens this connection after fetching the call-setup
/// document from `/incoming-call`.
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
