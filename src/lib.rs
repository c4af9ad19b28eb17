pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::*;
pub use errors::{AppError, AppResult, RelayError, RelayResult};
pub use state::AppState;

/// Build the complete application router with security headers applied.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    routes::api::create_api_router()
        .merge(routes::media_stream::create_media_stream_router())
        .with_state(app_state)
        .layer(security_headers)
}
