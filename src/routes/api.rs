use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, twiml};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: health check and call setup
///
/// The telephony provider may fetch `/incoming-call` with either GET or POST,
/// depending on how the phone number's webhook is configured.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route(
            "/incoming-call",
            get(twiml::incoming_call).post(twiml::incoming_call),
        )
        .layer(TraceLayer::new_for_http())
}
