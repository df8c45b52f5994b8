//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `embedding`: image to embedding
//! - `matching`: image or embedding to ranked matches

pub mod embedding;
pub mod health;
pub mod matching;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "name": "Facematch Server",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Facematch Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/generate-embedding",
            "/match-face",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Body of an upload-style request.
///
/// Multipart bodies contribute the `file` (or `image`) part as the image and
/// every other part as a text field. Any other content type is taken as raw
/// image bytes.
#[derive(Debug, Default)]
pub(crate) struct Upload {
    pub image: Option<Bytes>,
    pub fields: HashMap<String, String>,
}

pub(crate) fn is_multipart(request: &Request) -> bool {
    content_type(request).starts_with("multipart/form-data")
}

pub(crate) fn content_type(request: &Request) -> &str {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub(crate) async fn read_upload(
    request: Request,
    state: &Arc<ServerState>,
) -> ServerResult<Upload> {
    if !is_multipart(&request) {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        return Ok(Upload {
            image: (!body.is_empty()).then_some(body),
            fields: HashMap::new(),
        });
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let mut upload = Upload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                upload.image = Some(bytes);
            }
            _ => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.body_text()))?;
                upload.fields.insert(name, text);
            }
        }
    }
    Ok(upload)
}
