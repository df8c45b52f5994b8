use super::read_upload;
use crate::error::{ServerError, ServerResult};
use crate::telemetry::record_embedding_request;
use crate::state::ServerState;
use axum::extract::{Request, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Embedding response
#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    pub dimension: usize,
    pub model: String,
    pub status: &'static str,
}

/// Generate a unit-length face embedding from an uploaded image.
///
/// Accepts `multipart/form-data` with a `file` part, or the raw image as the
/// request body. The largest detected face is used.
pub async fn generate_embedding(
    State(state): State<Arc<ServerState>>,
    request: Request,
) -> ServerResult<impl IntoResponse> {
    let start = Instant::now();
    let upload = read_upload(request, &state).await?;
    let image = upload
        .image
        .ok_or_else(|| ServerError::BadRequest("missing image: send a `file` part".into()))?;

    let embedding = match state.service.pipeline().embed_bytes(&image).await {
        Ok(embedding) => embedding,
        Err(err) => {
            record_embedding_request("failure");
            tracing::warn!(error = %err, "embedding_failure");
            return Err(err.into());
        }
    };
    record_embedding_request("success");

    tracing::info!(
        bytes = image.len(),
        dimension = embedding.dim(),
        elapsed_micros = start.elapsed().as_micros(),
        "embedding_success"
    );

    Ok(Json(EmbeddingResponse {
        dimension: embedding.dim(),
        embedding: embedding.into_vec(),
        model: state.model_name().to_string(),
        status: "success",
    }))
}
