//! Blueprint Repository
//!
//! Handles all database operations related to blueprints.

use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tributary_core::domain::blueprint::{Blueprint, BlueprintConnection, SyncPolicy};
use tributary_core::domain::plan::PipelinePlan;
use tributary_core::dto::blueprint::{
    BlueprintQuery, BlueprintType, DAILY_CRON, MONTHLY_CRON, WEEKLY_CRON,
};
use uuid::Uuid;

use crate::error::StoreError;

const BLUEPRINT_COLUMNS: &str = r#"
    id, name, mode, project_name, cron_config, is_manual, enable,
    connections, labels, skip_on_fail, full_sync, skip_collectors, time_after,
    before_plan, after_plan, plan, created_at, updated_at
"#;

/// Insert a blueprint, or replace the stored one with the same id
pub async fn save(pool: &PgPool, blueprint: &Blueprint) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO blueprints (
            id, name, mode, project_name, cron_config, is_manual, enable,
            connections, labels, skip_on_fail, full_sync, skip_collectors, time_after,
            before_plan, after_plan, plan, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, project_name = EXCLUDED.project_name,
            cron_config = EXCLUDED.cron_config, is_manual = EXCLUDED.is_manual,
            enable = EXCLUDED.enable, connections = EXCLUDED.connections,
            labels = EXCLUDED.labels, skip_on_fail = EXCLUDED.skip_on_fail,
            full_sync = EXCLUDED.full_sync, skip_collectors = EXCLUDED.skip_collectors,
            time_after = EXCLUDED.time_after, before_plan = EXCLUDED.before_plan,
            after_plan = EXCLUDED.after_plan, plan = EXCLUDED.plan,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(blueprint.id)
    .bind(&blueprint.name)
    .bind(blueprint.mode.as_str())
    .bind(&blueprint.project_name)
    .bind(&blueprint.cron_config)
    .bind(blueprint.is_manual)
    .bind(blueprint.enable)
    .bind(Json(&blueprint.connections))
    .bind(&blueprint.labels)
    .bind(blueprint.sync_policy.skip_on_fail)
    .bind(blueprint.sync_policy.full_sync)
    .bind(blueprint.sync_policy.skip_collectors)
    .bind(blueprint.sync_policy.time_after)
    .bind(Json(&blueprint.before_plan))
    .bind(Json(&blueprint.after_plan))
    .bind(Json(&blueprint.plan))
    .bind(blueprint.created_at)
    .bind(blueprint.updated_at)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Constraint(format!(
            "project_name {} is already used",
            blueprint.project_name
        )),
        e => StoreError::Database(e),
    })?;

    Ok(())
}

/// Find a blueprint by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Blueprint>, StoreError> {
    let row = sqlx::query_as::<_, BlueprintRow>(&format!(
        "SELECT {} FROM blueprints WHERE id = $1",
        BLUEPRINT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Blueprint::try_from).transpose()
}

/// Find the blueprint owning a project
pub async fn find_by_project_name(
    pool: &PgPool,
    project_name: &str,
) -> Result<Option<Blueprint>, StoreError> {
    let row = sqlx::query_as::<_, BlueprintRow>(&format!(
        "SELECT {} FROM blueprints WHERE project_name = $1",
        BLUEPRINT_COLUMNS
    ))
    .bind(project_name)
    .fetch_optional(pool)
    .await?;

    row.map(Blueprint::try_from).transpose()
}

/// List blueprints matching a query, newest first, with the unpaginated count
pub async fn find(
    pool: &PgPool,
    query: &BlueprintQuery,
) -> Result<(Vec<Blueprint>, i64), StoreError> {
    let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blueprints");
    push_filters(&mut count_builder, query);
    let count: i64 = count_builder.build_query_scalar().fetch_one(pool).await?;

    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {} FROM blueprints", BLUEPRINT_COLUMNS));
    push_filters(&mut builder, query);
    builder.push(" ORDER BY created_at DESC");
    if let Some(limit) = query.limit() {
        builder.push(" LIMIT ").push_bind(i64::from(limit));
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        builder.push(" OFFSET ").push_bind(offset);
    }

    let rows = builder
        .build_query_as::<BlueprintRow>()
        .fetch_all(pool)
        .await?;

    let blueprints = rows
        .into_iter()
        .map(Blueprint::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((blueprints, count))
}

/// Delete a blueprint by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM blueprints WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BlueprintQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(enable) = query.enable {
        builder.push(" AND enable = ").push_bind(enable);
    }

    if let Some(label) = &query.label {
        builder
            .push(" AND ")
            .push_bind(label.clone())
            .push(" = ANY(labels)");
    }

    match query.is_manual {
        Some(is_manual) => {
            builder.push(" AND is_manual = ").push_bind(is_manual);
        }
        None => match query.blueprint_type {
            BlueprintType::All => {}
            BlueprintType::Manual => {
                builder.push(" AND is_manual = TRUE");
            }
            BlueprintType::Daily | BlueprintType::Weekly | BlueprintType::Monthly => {
                let cron = query.blueprint_type.cron().unwrap_or_default();
                builder
                    .push(" AND is_manual = FALSE AND cron_config = ")
                    .push_bind(cron);
            }
            BlueprintType::Custom => {
                builder
                    .push(" AND is_manual = FALSE AND cron_config NOT IN (")
                    .push_bind(DAILY_CRON)
                    .push(", ")
                    .push_bind(WEEKLY_CRON)
                    .push(", ")
                    .push_bind(MONTHLY_CRON)
                    .push(")");
            }
        },
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BlueprintRow {
    id: Uuid,
    name: String,
    mode: String,
    project_name: String,
    cron_config: String,
    is_manual: bool,
    enable: bool,
    connections: Json<Vec<BlueprintConnection>>,
    labels: Vec<String>,
    skip_on_fail: bool,
    full_sync: bool,
    skip_collectors: bool,
    time_after: Option<chrono::DateTime<chrono::Utc>>,
    before_plan: Json<PipelinePlan>,
    after_plan: Json<PipelinePlan>,
    plan: Json<PipelinePlan>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<BlueprintRow> for Blueprint {
    type Error = StoreError;

    fn try_from(row: BlueprintRow) -> Result<Self, Self::Error> {
        let mode = row
            .mode
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("blueprint {}: {}", row.id, e)))?;

        Ok(Blueprint {
            id: row.id,
            name: row.name,
            mode,
            project_name: row.project_name,
            cron_config: row.cron_config,
            is_manual: row.is_manual,
            enable: row.enable,
            connections: row.connections.0,
            labels: row.labels,
            sync_policy: SyncPolicy {
                skip_on_fail: row.skip_on_fail,
                full_sync: row.full_sync,
                skip_collectors: row.skip_collectors,
                time_after: row.time_after,
            },
            before_plan: row.before_plan.0,
            after_plan: row.after_plan.0,
            plan: row.plan.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
