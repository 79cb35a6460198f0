//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the chat endpoints (submit, poll, stream) and static assets under a
//! single Axum router. Chat endpoints sit behind a CORS layer that mirrors
//! the request origin so the page can be served from elsewhere.

pub mod chat;
pub mod identity;

use axum::Router;
use axum::http::{HeaderName, StatusCode, header};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Chat endpoints shared by the page and any cross-origin client.
fn chat_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(Any)
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
            // htmx request headers
            HeaderName::from_static("hx-target"),
            HeaderName::from_static("hx-current-url"),
            HeaderName::from_static("hx-trigger"),
            HeaderName::from_static("hx-request"),
        ]);

    Router::new()
        .route("/send", post(chat::send))
        .route("/messages", get(chat::messages))
        .route("/stream", get(chat::stream))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// Full application: chat endpoints, `/static/*` assets, and the index page.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let index_file = state.config.index_file.clone();

    chat_routes(state)
        .nest_service("/static", ServeDir::new(static_dir))
        .route_service("/", ServeFile::new(index_file))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
