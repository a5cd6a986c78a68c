//! QR code of the chat URL, for phones on the same network.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use utoipa::OpenApi;

use super::landing::LandingQuery;
use crate::error::ServerError;
use crate::state::AppState;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// Rendered edge length in pixels.
const QR_SIZE: u32 = 280;

#[derive(OpenApi)]
#[openapi(paths(qr))]
pub struct QrApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/qr", get(qr))
}

/// Encode `data` as an SVG QR code.
pub fn qr_svg(data: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .quiet_zone(true)
        .build())
}

/// `data:` URI of the QR code for inline `<img>` use.
pub fn qr_data_uri(data: &str) -> Result<String, qrcode::types::QrError> {
    let svg = qr_svg(data)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg);
    Ok(format!("data:{SVG_CONTENT_TYPE};base64,{encoded}"))
}

#[utoipa::path(
    get,
    path = "/qr",
    tag = "landing",
    params(LandingQuery),
    responses(
        (status = 200, description = "QR code of the chat URL", body = String, content_type = "image/svg+xml"),
        (status = 400, description = "URL too long to encode"),
    )
)]
pub async fn qr(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LandingQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let url = query.resolve(&state);
    let svg = qr_svg(&url)
        .map_err(|e| ServerError::BadRequest(format!("cannot encode url as QR code: {e}")))?;
    Ok(([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg))
}
