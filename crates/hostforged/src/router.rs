//! HTTP router configuration

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::api::{system, ws};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // System endpoints
        .route("/health", get(system::health))
        // Deployment sessions
        .route("/ws/{client_id}", get(ws::handler))
        // State
        .with_state(state)
}
