//! HTTP surface of the relay

pub mod chat;
pub mod state;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use state::AppState;
use tower_http::cors::{Any, CorsLayer};

#[derive(serde::Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: chatrelay_core::version(),
    })
}

/// Build the application router. Method routing enforces POST on the
/// submission endpoint; other methods get 405 Method Not Allowed.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::relay_chat))
        .layer(cors)
        .with_state(state)
}
