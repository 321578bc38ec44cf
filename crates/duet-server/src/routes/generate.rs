use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;
use duet_core::schemas::GenerateMotionRequest;
use crate::artifact;
use crate::error::ApiError;
use crate::generation::GenerationRequest;
use crate::state::ServerState;

/// Generate a two-person motion video and stream it back as an attachment.
/// The file on disk is removed once the body has been sent or abandoned.
pub async fn generate_motion(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<GenerateMotionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = GenerationRequest::validate(body)?;
    let guard = state.generation().generate(request).await?;

    let media_type = guard.artifact().media_type;
    let disposition = format!("attachment; filename=\"{}\"", guard.artifact().download_name());
    let body = artifact::into_body(guard).await.map_err(|e| {
        error!("failed to open artifact: {e}");
        ApiError::Internal("Video generation failed".into())
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
