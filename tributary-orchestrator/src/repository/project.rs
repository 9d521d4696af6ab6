//! Project Repository
//!
//! Read access to projects and their metric plugin settings.

use sqlx::PgPool;
use tributary_core::domain::project::{Project, ProjectMetricSetting};

use crate::error::StoreError;

/// Find a project by name
pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Project>, StoreError> {
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT name, description, created_at
        FROM projects
        WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Enabled metric settings of a project, ordered by plugin name
pub async fn find_enabled_metrics(
    pool: &PgPool,
    project_name: &str,
) -> Result<Vec<ProjectMetricSetting>, StoreError> {
    let rows = sqlx::query_as::<_, MetricSettingRow>(
        r#"
        SELECT project_name, plugin_name, plugin_option, enable
        FROM project_metric_settings
        WHERE project_name = $1 AND enable = TRUE
        ORDER BY plugin_name
        "#,
    )
    .bind(project_name)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    name: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MetricSettingRow {
    project_name: String,
    plugin_name: String,
    plugin_option: serde_json::Value,
    enable: bool,
}

impl From<MetricSettingRow> for ProjectMetricSetting {
    fn from(row: MetricSettingRow) -> Self {
        ProjectMetricSetting {
            project_name: row.project_name,
            plugin_name: row.plugin_name,
            plugin_option: row.plugin_option,
            enable: row.enable,
        }
    }
}
