use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, meetings};
use crate::meetings::MeetingService;

#[derive(Clone)]
pub struct AppState {
    pub meetings: Arc<MeetingService>,
    pub api_title: String,
    pub api_version: String,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health_check))
        // Meeting routes
        .route(
            "/meetings",
            get(meetings::list_meetings).post(meetings::create_meeting),
        )
        .route(
            "/meetings/:id",
            get(meetings::get_meeting)
                .put(meetings::update_meeting)
                .delete(meetings::delete_meeting),
        )
}

pub fn create_app(state: AppState, cors_origins: Option<Vec<String>>) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}

/// Restrict CORS to the configured origins; without any, allow all.
fn build_cors_layer(allowed_origins: Option<Vec<String>>) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, using permissive CORS");
        return CorsLayer::permissive();
    }

    tracing::info!("CORS configured for origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
