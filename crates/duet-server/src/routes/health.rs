use std::sync::Arc;
use axum::extract::State;
use axum::Json;
use duet_core::schemas::HealthResponse;
use crate::state::ServerState;

pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        model_loaded: state.model_loaded(),
    })
}
