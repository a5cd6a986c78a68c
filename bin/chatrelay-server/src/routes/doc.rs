use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::{chat, health, landing, qr, stream};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(info(
    title = "chatrelay-server",
    description = "Streaming chat relay for Ollama and the Gemini CLI"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(stream::StreamApi::openapi());
    root.merge(landing::LandingApi::openapi());
    root.merge(qr::QrApi::openapi());
    root
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(get_docs()) }),
    )
}
