//! Repository Module
//!
//! Data access layer for the orchestrator. The store is the source of truth
//! for blueprints; the cron schedule is only a projection of it.
//!
//! Both contracts are trait-based so the service can run against PostgreSQL
//! in production and against the in-memory store in tests.

pub mod blueprint;
pub mod memory;
pub mod pipeline;
pub mod project;

use async_trait::async_trait;
use sqlx::PgPool;
use tributary_core::domain::blueprint::Blueprint;
use tributary_core::domain::pipeline::Pipeline;
use tributary_core::domain::project::{Project, ProjectMetricSetting};
use tributary_core::dto::blueprint::BlueprintQuery;
use tributary_core::dto::pipeline::NewPipeline;
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use pipeline::PgPipelineQueue;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Backing store for blueprints and the project data they reference
#[async_trait]
pub trait BlueprintStore: Send + Sync {
    /// Blueprints matching `query`, plus the total count ignoring pagination
    async fn find_blueprints(&self, query: &BlueprintQuery) -> StoreResult<(Vec<Blueprint>, i64)>;

    async fn find_blueprint(&self, id: Uuid) -> StoreResult<Option<Blueprint>>;

    async fn find_blueprint_by_project(&self, project_name: &str)
    -> StoreResult<Option<Blueprint>>;

    /// Inserts or replaces the blueprint with the same id
    async fn save_blueprint(&self, blueprint: &Blueprint) -> StoreResult<()>;

    /// Returns false when nothing was deleted
    async fn delete_blueprint(&self, id: Uuid) -> StoreResult<bool>;

    async fn find_project(&self, name: &str) -> StoreResult<Option<Project>>;

    /// Enabled metric settings of a project
    async fn find_project_metrics(&self, project_name: &str)
    -> StoreResult<Vec<ProjectMetricSetting>>;
}

/// Hand-off point to the pipeline executor
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Persists the pipeline so the executor can pick it up
    async fn submit_pipeline(&self, req: NewPipeline) -> StoreResult<Pipeline>;
}

/// PostgreSQL implementation of [`BlueprintStore`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlueprintStore for PgStore {
    async fn find_blueprints(&self, query: &BlueprintQuery) -> StoreResult<(Vec<Blueprint>, i64)> {
        blueprint::find(&self.pool, query).await
    }

    async fn find_blueprint(&self, id: Uuid) -> StoreResult<Option<Blueprint>> {
        blueprint::find_by_id(&self.pool, id).await
    }

    async fn find_blueprint_by_project(
        &self,
        project_name: &str,
    ) -> StoreResult<Option<Blueprint>> {
        blueprint::find_by_project_name(&self.pool, project_name).await
    }

    async fn save_blueprint(&self, record: &Blueprint) -> StoreResult<()> {
        blueprint::save(&self.pool, record).await
    }

    async fn delete_blueprint(&self, id: Uuid) -> StoreResult<bool> {
        blueprint::delete(&self.pool, id).await
    }

    async fn find_project(&self, name: &str) -> StoreResult<Option<Project>> {
        project::find_by_name(&self.pool, name).await
    }

    async fn find_project_metrics(
        &self,
        project_name: &str,
    ) -> StoreResult<Vec<ProjectMetricSetting>> {
        project::find_enabled_metrics(&self.pool, project_name).await
    }
}
