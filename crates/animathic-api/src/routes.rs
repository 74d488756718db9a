//! Router assembly (spec §6 HTTP contract).

use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::generate::generate;
use crate::handlers::health::{health, ready};
use crate::handlers::status::get_status;
use crate::handlers::videos::{delete_video, list_videos, stream_video};
use crate::state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the full HTTP router: `/api/*` handlers plus unauthenticated
/// health probes, with request tracing, CORS, and a body size cap applied
/// uniformly (spec §6 configuration, §10.6 ambient concerns).
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/generate", post(generate))
        .route("/status/:job_id", get(get_status))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", delete(delete_video))
        .route("/videos/:video_id/stream", get(stream_video));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(tower_http::timeout::TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout.as_secs(),
        )))
        .with_state(state)
}
