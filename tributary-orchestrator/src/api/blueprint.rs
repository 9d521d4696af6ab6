//! Blueprint API Handlers
//!
//! HTTP endpoints for blueprint management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tributary_core::domain::blueprint::{Blueprint, SyncPolicy};
use tributary_core::domain::pipeline::Pipeline;
use tributary_core::dto::blueprint::{BlueprintList, BlueprintQuery, CreateBlueprint, PatchBlueprint};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::scheduler::ScheduledBlueprint;

/// POST /blueprints
pub async fn create_blueprint(
    State(service): State<AppState>,
    Json(req): Json<CreateBlueprint>,
) -> ApiResult<(StatusCode, Json<Blueprint>)> {
    tracing::info!("Creating blueprint: {}", req.name);

    let blueprint = service.create(req).await?;
    Ok((StatusCode::CREATED, Json(blueprint)))
}

/// GET /blueprints
pub async fn list_blueprints(
    State(service): State<AppState>,
    Query(query): Query<BlueprintQuery>,
) -> ApiResult<Json<BlueprintList>> {
    tracing::debug!("Listing blueprints: {:?}", query);

    Ok(Json(service.list(&query).await?))
}

/// GET /blueprints/schedule
/// Cron entries currently registered
pub async fn list_schedule(State(service): State<AppState>) -> Json<Vec<ScheduledBlueprint>> {
    Json(service.schedule().await)
}

/// GET /blueprints/{id}
pub async fn get_blueprint(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Blueprint>> {
    tracing::debug!("Getting blueprint: {}", id);

    Ok(Json(service.get(id).await?))
}

/// PATCH /blueprints/{id}
pub async fn patch_blueprint(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PatchBlueprint>,
) -> ApiResult<Json<Blueprint>> {
    tracing::info!("Updating blueprint: {}", id);

    Ok(Json(service.patch(id, patch).await?))
}

/// DELETE /blueprints/{id}
pub async fn delete_blueprint(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting blueprint: {}", id);

    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /blueprints/{id}/trigger
/// Run a blueprint now, overriding `skip_collectors` and `full_sync`
///
/// The body is optional; without one the blueprint runs with the default
/// overrides.
pub async fn trigger_blueprint(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    sync_policy: Option<Json<SyncPolicy>>,
) -> ApiResult<Json<Pipeline>> {
    tracing::info!("Triggering blueprint: {}", id);

    let sync_policy = sync_policy.map(|Json(policy)| policy).unwrap_or_default();
    Ok(Json(service.trigger(id, &sync_policy).await?))
}

/// GET /projects/{name}/blueprint
pub async fn get_project_blueprint(
    State(service): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Option<Blueprint>>> {
    tracing::debug!("Getting blueprint of project: {}", name);

    Ok(Json(service.get_by_project(&name).await?))
}
