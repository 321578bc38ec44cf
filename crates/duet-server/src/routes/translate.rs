use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use duet_core::schemas::{TranslateRequest, TranslateResponse};
use crate::error::ApiError;
use crate::state::ServerState;

pub async fn translate(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let Json(req) = payload?;
    let translation = state.translator().translate(&req.text, &req.target_lang).await?;
    Ok(Json(TranslateResponse { translation }))
}
