use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create projects table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            name VARCHAR(255) PRIMARY KEY,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create project metric settings table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_metric_settings (
            project_name VARCHAR(255) NOT NULL REFERENCES projects(name) ON DELETE CASCADE,
            plugin_name VARCHAR(255) NOT NULL,
            plugin_option JSONB NOT NULL DEFAULT '{}',
            enable BOOLEAN NOT NULL DEFAULT TRUE,
            PRIMARY KEY (project_name, plugin_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create blueprints table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blueprints (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            mode VARCHAR(20) NOT NULL,
            project_name VARCHAR(255) NOT NULL DEFAULT '',
            cron_config VARCHAR(255) NOT NULL,
            is_manual BOOLEAN NOT NULL DEFAULT FALSE,
            enable BOOLEAN NOT NULL DEFAULT TRUE,
            connections JSONB NOT NULL DEFAULT '[]',
            labels TEXT[] NOT NULL DEFAULT '{}',
            skip_on_fail BOOLEAN NOT NULL DEFAULT FALSE,
            full_sync BOOLEAN NOT NULL DEFAULT FALSE,
            skip_collectors BOOLEAN NOT NULL DEFAULT FALSE,
            time_after TIMESTAMPTZ,
            before_plan JSONB NOT NULL DEFAULT '[]',
            after_plan JSONB NOT NULL DEFAULT '[]',
            plan JSONB NOT NULL DEFAULT '[]',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One blueprint per project
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_blueprints_project_name
        ON blueprints(project_name) WHERE project_name <> ''
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_blueprints_created_at ON blueprints(created_at DESC)")
        .execute(pool)
        .await?;

    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            blueprint_id UUID NOT NULL,
            plan JSONB NOT NULL,
            labels TEXT[] NOT NULL DEFAULT '{}',
            sync_policy JSONB NOT NULL DEFAULT '{}',
            status VARCHAR(50) NOT NULL,
            total_tasks INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pipelines_status ON pipelines(status)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipelines_blueprint_id ON pipelines(blueprint_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
