//! One-shot chat endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatBody, ChatReply};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat_help, chat), components(schemas(ChatBody, ChatReply)))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", get(chat_help).post(chat))
}

const HELP: &str = concat!(
    "<html><body><h3>Chat endpoint</h3>",
    "<p>This endpoint accepts JSON via <code>POST /chat</code>; ",
    "<code>POST /chat_stream</code> streams the reply as NDJSON.</p>",
    "<pre>{\n  \"message\": \"Hello\",\n  \"messages\": [{\"role\": \"user\", \"content\": \"...\"}],\n",
    "  \"provider\": \"ollama|gemini\"\n}</pre>",
    "<p>Example: <code>curl -X POST -H 'Content-Type: application/json' ",
    "-d '{\"message\":\"Hello\"}' http://HOST:PORT/chat</code></p>",
    "</body></html>",
);

/// Usage help for browsers that open the chat URL directly.
#[utoipa::path(
    get,
    path = "/chat",
    tag = "chat",
    responses((status = 200, description = "Usage help", body = String, content_type = "text/html"))
)]
pub async fn chat_help() -> Html<&'static str> {
    Html(HELP)
}

/// Run a generation to completion and return the whole reply.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatBody,
    responses(
        (status = 200, description = "Reply generated", body = ChatReply),
        (status = 400, description = "Missing message or malformed body"),
        (status = 502, description = "Backend unreachable or failed"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatReply>, ServerError> {
    let request = ChatBody::parse(&body)?.into_request()?;
    debug!(
        provider = %request.provider,
        message_len = request.message.len(),
        turns = request.history.len(),
        "chat request"
    );

    let reply = state.relay.complete(&request).await?;
    info!(provider = %request.provider, output_len = reply.len(), "chat done");
    Ok(Json(ChatReply { reply }))
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chatrelay_core::{BridgeError, OutputRecord};
    use serde_json::Value;

    use crate::routes::test_support::{app, body_text, default_app, post_json, send, Canned};

    #[tokio::test]
    async fn get_serves_usage_help() {
        let response = send(
            default_app(),
            Request::get("/chat").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_owned();
        assert!(content_type.starts_with("text/html"));
        assert!(body_text(response).await.contains("POST /chat"));
    }

    #[tokio::test]
    async fn post_returns_full_reply() {
        let response = send(default_app(), post_json("/chat", r#"{"message":"hi"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reply"], "Hello");
    }

    #[tokio::test]
    async fn provider_routes_to_cli_backend() {
        let response = send(
            default_app(),
            post_json("/chat", r#"{"message":"hi","provider":"gemini"}"#),
        )
        .await;
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reply"], "from gemini");
    }

    #[tokio::test]
    async fn missing_message_is_rejected() {
        let response = send(default_app(), post_json("/chat", "{}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "message is required");
    }

    #[tokio::test]
    async fn backend_failure_is_bad_gateway() {
        let app = app(
            Canned::failing(BridgeError::Transport("connection refused".into())),
            Canned::replying(vec![OutputRecord::response("unused")]),
        );
        let response = send(app, post_json("/chat", r#"{"message":"hi"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "ollama request failed: connection refused");
    }
}
