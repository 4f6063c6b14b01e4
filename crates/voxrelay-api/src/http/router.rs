//! Axum router configuration with middleware.
//!
//! All API routes live under `/api/`. Middleware: CORS, request tracing.
//! The browser frontend is served from the configured static directory if
//! it exists; unknown paths fall through to its `index.html`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.static_dir.clone();

    let api_routes = Router::new()
        .route("/transcribe", post(handlers::transcribe::transcribe_audio))
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::stream_chat))
        .route("/clear", post(handlers::session::clear_history))
        .route("/health", get(handlers::health::health_check))
        .route("/sessions", get(handlers::session::list_sessions))
        .route(
            "/session/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        );

    let mut router = Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Serve the recorder frontend from disk when present. API routes take
    // priority; unknown paths fall through to index.html.
    if static_dir.exists() {
        let index_path = static_dir.join("index.html");
        let serve_dir = ServeDir::new(&static_dir).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %static_dir.display(), "static file serving enabled");
    }

    router
}
