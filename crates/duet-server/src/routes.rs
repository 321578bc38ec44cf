use std::sync::Arc;
use axum::Router;
use axum::routing::{get, post};
use duet_core::{GENERATE_PATH, HEALTH_PATH, TRANSLATE_PATH};
use crate::routes::generate::generate_motion;
use crate::routes::health::health;
use crate::routes::translate::translate;
use crate::state::ServerState;

mod generate;
mod health;
mod translate;

pub fn api_routes() -> Router<Arc<ServerState>> {
    Router::new()
        .route(GENERATE_PATH, post(generate_motion))
        .route(TRANSLATE_PATH, post(translate))
        .route(HEALTH_PATH, get(health))
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    api_routes().with_state(state)
}
