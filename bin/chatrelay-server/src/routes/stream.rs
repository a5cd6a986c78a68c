//! NDJSON streaming chat endpoint.
//!
//! The reply is written one JSON object per line as the backend produces
//! it: `{"response": "..."}` for each piece of text and at most one final
//! `{"error": "..."}`. Validation failures are answered before streaming
//! starts, with a plain 400.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chatrelay_core::writer;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::ChatBody;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat_stream), components(schemas(ChatBody)))]
pub struct StreamApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat_stream", post(chat_stream))
}

#[utoipa::path(
    post,
    path = "/chat_stream",
    tag = "chat",
    request_body = ChatBody,
    responses(
        (status = 200, description = "NDJSON record stream", body = String, content_type = "application/x-ndjson"),
        (status = 400, description = "Missing message or malformed body"),
    )
)]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ServerError> {
    let request = ChatBody::parse(&body)?.into_request()?;
    info!(
        provider = %request.provider,
        message_len = request.message.len(),
        turns = request.history.len(),
        "chat stream opened"
    );

    let records = state.relay.stream(&request).await;
    let body = writer::ndjson_body(records, state.config.stream_buffer);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(writer::NDJSON_CONTENT_TYPE),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        Body::from_stream(body),
    )
        .into_response())
}
