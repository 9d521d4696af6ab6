//! Pipeline Repository
//!
//! Persists submitted pipelines. The executor picks up rows in the
//! `Created` state; nothing here runs them.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tributary_core::domain::pipeline::{Pipeline, PipelineStatus};
use tributary_core::dto::pipeline::NewPipeline;
use uuid::Uuid;

use crate::error::StoreError;
use crate::repository::{PipelineExecutor, StoreResult};

/// Create a new pipeline in the database
pub async fn create(pool: &PgPool, req: NewPipeline) -> Result<Pipeline, StoreError> {
    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        total_tasks: req.plan.task_count(),
        name: req.name,
        blueprint_id: req.blueprint_id,
        plan: req.plan,
        labels: req.labels,
        sync_policy: req.sync_policy,
        status: PipelineStatus::Created,
        created_at: chrono::Utc::now(),
    };

    let total_tasks = total_tasks_column(pipeline.total_tasks)?;

    sqlx::query(
        r#"
        INSERT INTO pipelines (
            id, name, blueprint_id, plan, labels, sync_policy,
            status, total_tasks, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(pipeline.id)
    .bind(&pipeline.name)
    .bind(pipeline.blueprint_id)
    .bind(Json(&pipeline.plan))
    .bind(&pipeline.labels)
    .bind(Json(&pipeline.sync_policy))
    .bind(pipeline.status.as_str())
    .bind(total_tasks)
    .bind(pipeline.created_at)
    .execute(pool)
    .await?;

    Ok(pipeline)
}

/// Task count as stored in the INTEGER `total_tasks` column
fn total_tasks_column(total_tasks: usize) -> Result<i32, StoreError> {
    i32::try_from(total_tasks).map_err(|_| {
        StoreError::Constraint(format!(
            "pipeline has {} tasks, more than the total_tasks column holds",
            total_tasks
        ))
    })
}

/// Pipeline executor backed by the `pipelines` table
#[derive(Debug, Clone)]
pub struct PgPipelineQueue {
    pool: PgPool,
}

impl PgPipelineQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineExecutor for PgPipelineQueue {
    async fn submit_pipeline(&self, req: NewPipeline) -> StoreResult<Pipeline> {
        let pipeline = create(&self.pool, req).await?;
        tracing::info!(
            "Pipeline queued: {} ({}) with {} task(s)",
            pipeline.name,
            pipeline.id,
            pipeline.total_tasks
        );
        Ok(pipeline)
    }
}
