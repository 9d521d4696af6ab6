//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::blueprint::SyncPolicy;
use crate::domain::plan::PipelinePlan;

/// Request handed to the pipeline executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    pub blueprint_id: Uuid,
    pub plan: PipelinePlan,
    pub labels: Vec<String>,
    pub sync_policy: SyncPolicy,
}
