//! Landing page advertising the chat URL to other devices on the LAN.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use super::qr::qr_data_uri;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(landing))]
pub struct LandingApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(landing))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LandingQuery {
    /// URL to show instead of the detected LAN chat URL.
    pub u: Option<String>,
}

impl LandingQuery {
    /// The requested URL, or the detected chat URL when absent or blank.
    pub fn resolve(self, state: &AppState) -> String {
        self.u
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| state.chat_url.clone())
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "landing",
    params(LandingQuery),
    responses((status = 200, description = "Landing page", body = String, content_type = "text/html"))
)]
pub async fn landing(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LandingQuery>,
) -> Html<String> {
    Html(render(&query.resolve(&state)))
}

fn render(url: &str) -> String {
    let href = html_escape::encode_double_quoted_attribute(url);
    let text = html_escape::encode_text(url);
    let image = match qr_data_uri(url) {
        Ok(uri) => format!(
            "<img src=\"{uri}\" alt=\"qr\" style=\"width:280px;height:280px;\"/>"
        ),
        Err(e) => format!(
            "<p>QR code unavailable: {}</p>",
            html_escape::encode_text(&e.to_string())
        ),
    };
    format!(
        "<!doctype html><html><head>\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/>\
         <title>Local LLM Server</title>\
         <style>body{{font-family:-apple-system,system-ui,Segoe UI,Roboto,sans-serif;\
         display:flex;min-height:100vh;align-items:center;justify-content:center;\
         background:#fafafa;color:#222}}\
         .card{{background:#fff;border:1px solid #eee;border-radius:12px;padding:24px;\
         box-shadow:0 6px 20px rgba(0,0,0,.06);text-align:center}}\
         a{{word-break:break-all}}</style></head><body><div class=\"card\">\
         <h2>Local LLM Server</h2><p><a href=\"{href}\">{text}</a></p>{image}\
         <p style=\"margin-top:12px\">Scan the QR with your camera, or share the URL to your phone.</p>\
         </div></body></html>"
    )
}
