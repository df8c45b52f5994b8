use super::{content_type, is_multipart, read_upload};
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Query, Request, State};
use axum::response::IntoResponse;
use axum::Json;
use matcher::{Match, QuerySource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// JSON match request
#[derive(Debug, Deserialize)]
pub struct MatchFaceRequest {
    /// Raw query vector; validated server-side.
    #[serde(default)]
    pub embedding: Option<Value>,

    /// Minimum similarity (0.0 to 1.0)
    #[serde(default)]
    pub threshold: Option<f32>,
}

/// `?threshold=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct MatchParams {
    #[serde(default)]
    pub threshold: Option<f32>,
}

/// Match response
#[derive(Debug, Serialize)]
pub struct MatchFaceResponse {
    pub status: &'static str,
    pub matches_found: usize,
    pub threshold: f32,
    pub matches: Vec<Match>,
}

/// Match a face against every enrolled record.
///
/// The query is either a JSON body `{"embedding": [...], "threshold": 0.6}`,
/// a multipart form with a `file` part (or an `embedding` part holding a JSON
/// array) and an optional `threshold` part, or a raw image body. A threshold in
/// the body wins over `?threshold=`; without either the configured default
/// applies.
pub async fn match_face(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<MatchParams>, QueryRejection>,
    request: Request,
) -> ServerResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let (source, body_threshold) = read_query(request, &state).await?;
    let threshold = body_threshold.or(params.threshold);

    let outcome = state.service.match_query(source, threshold).await?;

    Ok(Json(MatchFaceResponse {
        status: "success",
        matches_found: outcome.matches_found,
        threshold: outcome.threshold,
        matches: outcome.matches,
    }))
}

async fn read_query(
    request: Request,
    state: &Arc<ServerState>,
) -> ServerResult<(QuerySource, Option<f32>)> {
    if content_type(&request).starts_with("application/json") {
        let Json(body) = Json::<MatchFaceRequest>::from_request(request, state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        let embedding = body
            .embedding
            .ok_or_else(|| ServerError::BadRequest("missing `embedding` field".into()))?;
        return Ok((QuerySource::Vector(embedding), body.threshold));
    }

    let multipart = is_multipart(&request);
    let mut upload = read_upload(request, state).await?;
    let threshold = upload
        .fields
        .remove("threshold")
        .map(|raw| parse_threshold(&raw))
        .transpose()?;

    if let Some(image) = upload.image {
        return Ok((QuerySource::Image(image.to_vec()), threshold));
    }
    if let Some(raw) = upload.fields.remove("embedding") {
        let vector: Value = serde_json::from_str(&raw)?;
        return Ok((QuerySource::Vector(vector), threshold));
    }

    let hint = if multipart {
        "expected a `file` or `embedding` part"
    } else {
        "empty request body"
    };
    Err(ServerError::BadRequest(format!("missing query: {hint}")))
}

fn parse_threshold(raw: &str) -> ServerResult<f32> {
    raw.trim()
        .parse::<f32>()
        .map_err(|_| ServerError::BadRequest(format!("threshold is not a number: {raw:?}")))
}
