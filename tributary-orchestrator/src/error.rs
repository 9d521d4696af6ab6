//! Error types for the orchestrator
//!
//! Each layer has its own error enum; `BlueprintError` is the one surfaced by
//! the blueprint service and classified with [`ErrorKind`].

use thiserror::Error;
use uuid::Uuid;

/// Failures of the backing store or the pipeline queue
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures while expanding a blueprint into a plan
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plugin not found: {0}")]
    UnknownPlugin(String),

    #[error("plugin {plugin} does not support {capability}")]
    Unsupported {
        plugin: String,
        capability: &'static str,
    },

    #[error("connection {connection_id} of plugin {plugin} has no scope")]
    NoScope { plugin: String, connection_id: u64 },

    #[error("invalid options for plugin {plugin}: {message}")]
    InvalidOptions { plugin: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cron expression or engine failures
#[derive(Debug, Error)]
pub enum CronError {
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidExpression { expr: String, message: String },

    #[error("no upcoming fire time for '{0}'")]
    NoUpcomingFire(String),
}

/// Category of a [`BlueprintError`], used to pick severity and status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Internal,
    /// Nothing to run; not a failure
    EmptyPlan,
}

/// Errors surfaced by the blueprint service
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("{0}")]
    BadInput(String),

    #[error("invalid cronConfig: {0}")]
    InvalidCron(#[source] CronError),

    #[error(
        "Each project can only be used by one blueprint. The currently selected projectName: [{project}] has been used by blueprint: [id:{owner_id}] [name:{owner_name}] and cannot be reused."
    )]
    ProjectConflict {
        project: String,
        owner_id: Uuid,
        owner_name: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("empty plan")]
    EmptyPlan,

    #[error("failed to make plan for blueprint [{blueprint_id}][{blueprint_name}]: {source}")]
    Plan {
        blueprint_id: Uuid,
        blueprint_name: String,
        #[source]
        source: PlanError,
    },

    #[error("failed to create pipeline for blueprint [{blueprint_id}][{blueprint_name}]: {source}")]
    Submit {
        blueprint_id: Uuid,
        blueprint_name: String,
        #[source]
        source: StoreError,
    },

    #[error("error reloading blueprints: {0}")]
    Reload(#[source] Box<BlueprintError>),

    #[error("created cron job failed for blueprint [{blueprint_id}]: {source}")]
    Schedule {
        blueprint_id: Uuid,
        #[source]
        source: CronError,
    },

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BlueprintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlueprintError::BadInput(_)
            | BlueprintError::InvalidCron(_)
            | BlueprintError::ProjectConflict { .. } => ErrorKind::BadInput,
            BlueprintError::NotFound(_) => ErrorKind::NotFound,
            BlueprintError::EmptyPlan => ErrorKind::EmptyPlan,
            BlueprintError::Plan { .. }
            | BlueprintError::Submit { .. }
            | BlueprintError::Reload(_)
            | BlueprintError::Schedule { .. }
            | BlueprintError::Internal(_)
            | BlueprintError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn is_empty_plan(&self) -> bool {
        matches!(self, BlueprintError::EmptyPlan)
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        BlueprintError::BadInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BlueprintError>;
