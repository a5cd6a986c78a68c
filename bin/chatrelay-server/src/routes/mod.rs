//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID span)
//! - `/chat_stream` NDJSON streaming and `/chat` one-shot replies
//! - `/healthz` heartbeat, the `/` landing page and its `/qr` code
//! - `/api-docs/openapi.json`

mod chat;
pub mod doc;
mod health;
mod landing;
mod qr;
mod stream;

use std::sync::Arc;

use axum::{middleware, Router};
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(chat::router())
        .merge(stream::router())
        .merge(landing::router())
        .merge(qr::router())
        .merge(doc::router())
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state)))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use chatrelay_core::{
        BridgeError, ChatBackend, ChatRequest, OutputRecord, RecordStream, Relay,
    };
    use futures::{stream, StreamExt};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::state::AppState;

    /// Replays fixed records, or fails every call when `failure` is set.
    pub struct Canned {
        pub records: Vec<OutputRecord>,
        pub failure: Option<BridgeError>,
    }

    impl Canned {
        pub fn replying(records: Vec<OutputRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                failure: None,
            })
        }

        pub fn failing(err: BridgeError) -> Arc<Self> {
            Arc::new(Self {
                records: Vec::new(),
                failure: Some(err),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn stream(&self, _request: &ChatRequest) -> RecordStream {
            match &self.failure {
                Some(err) => stream::iter(vec![OutputRecord::error(err.to_string())]).boxed(),
                None => stream::iter(self.records.clone()).boxed(),
            }
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<String, BridgeError> {
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(self
                    .records
                    .iter()
                    .filter_map(|r| match r {
                        OutputRecord::Response(text) => Some(text.as_str()),
                        OutputRecord::Error(_) => None,
                    })
                    .collect()),
            }
        }
    }

    pub fn app(ollama: Arc<dyn ChatBackend>, gemini: Arc<dyn ChatBackend>) -> axum::Router {
        let state = Arc::new(AppState {
            config: Arc::new(Config::default()),
            relay: Arc::new(Relay::new(ollama, gemini)),
            chat_url: "http://10.0.0.7:8000/chat".into(),
        });
        super::build(state)
    }

    pub fn default_app() -> axum::Router {
        app(
            Canned::replying(vec![
                OutputRecord::response("Hel"),
                OutputRecord::response("lo"),
            ]),
            Canned::replying(vec![OutputRecord::response("from gemini")]),
        )
    }

    pub async fn send(app: axum::Router, request: Request<Body>) -> Response<Body> {
        app.oneshot(request).await.unwrap()
    }

    pub fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    pub async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
