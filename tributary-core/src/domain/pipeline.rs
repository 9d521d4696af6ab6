//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::blueprint::SyncPolicy;
use crate::domain::plan::PipelinePlan;

/// Pipeline execution record
///
/// Created from a blueprint by the trigger; owned by the executor afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub blueprint_id: Uuid,
    pub plan: PipelinePlan,
    pub labels: Vec<String>,
    pub sync_policy: SyncPolicy,
    pub status: PipelineStatus,
    pub total_tasks: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Created => "Created",
            PipelineStatus::Running => "Running",
            PipelineStatus::Completed => "Completed",
            PipelineStatus::Failed => "Failed",
            PipelineStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(PipelineStatus::Created),
            "Running" => Ok(PipelineStatus::Running),
            "Completed" => Ok(PipelineStatus::Completed),
            "Failed" => Ok(PipelineStatus::Failed),
            "Cancelled" => Ok(PipelineStatus::Cancelled),
            other => Err(format!("unknown pipeline status: {}", other)),
        }
    }
}
