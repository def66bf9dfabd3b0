pub mod blocks;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/layout/policy", get(blocks::handle_get_policy))
        .route("/api/v1/blocks/validate", post(blocks::handle_validate_blocks))
        .route(
            "/api/v1/blocks/publish-check",
            post(blocks::handle_publish_check),
        )
        .with_state(state)
}
