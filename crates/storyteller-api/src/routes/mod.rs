//! Route modules and the application router.

pub mod chat;
pub mod health;
pub mod text_to_speech;

use std::path::Path;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router: health, the `/api` endpoints, and synthesized
/// audio served from `audio_dir` under `/audio`.
pub fn app(state: AppState, audio_dir: &Path) -> Router {
    // TODO: Replace CorsLayer::permissive() with the deployed client origin.
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(chat::router())
                .merge(text_to_speech::router()),
        )
        .nest_service("/audio", ServeDir::new(audio_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
