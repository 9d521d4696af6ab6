//! API Module
//!
//! HTTP API layer for the orchestrator.

pub mod blueprint;
pub mod error;
pub mod health;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::BlueprintService;

pub type AppState = Arc<BlueprintService>;

/// Create the main API router with all endpoints
pub fn create_router(service: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Blueprint endpoints
        .route(
            "/blueprints",
            post(blueprint::create_blueprint).get(blueprint::list_blueprints),
        )
        .route("/blueprints/schedule", get(blueprint::list_schedule))
        .route(
            "/blueprints/{id}",
            get(blueprint::get_blueprint)
                .patch(blueprint::patch_blueprint)
                .delete(blueprint::delete_blueprint),
        )
        .route("/blueprints/{id}/trigger", post(blueprint::trigger_blueprint))
        // Project endpoints
        .route(
            "/projects/{name}/blueprint",
            get(blueprint::get_project_blueprint),
        )
        // Add state and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}
