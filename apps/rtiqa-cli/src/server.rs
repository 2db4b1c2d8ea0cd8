//! HTTP surface: a health route and the chat endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use rtiqa_service::{QueryService, Reply, ReplyKind, ERROR_PREFIX};

pub const BANNER: &str = "Smart Legal Chatbot Backend Running Successfully!";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

pub fn router(service: Arc<QueryService>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": BANNER }))
}

async fn chat(State(service): State<Arc<QueryService>>, Json(req): Json<ChatRequest>) -> (StatusCode, Json<Reply>) {
    // Embedding and synthesis are CPU-bound.
    match tokio::task::spawn_blocking(move || service.reply(&req.query)).await {
        Ok(reply) => (StatusCode::OK, Json(reply)),
        Err(e) => {
            error!(error = %e, "chat worker failed");
            let reply = Reply { response: format!("{ERROR_PREFIX} {e}"), outcome: ReplyKind::Error };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(reply))
        }
    }
}
