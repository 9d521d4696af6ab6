//! Blueprint domain types
//!
//! A blueprint is the declarative description of a recurring ingestion job:
//! which connections and scopes to collect, when to run, and how to wrap the
//! generated plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::plan::PipelinePlan;

/// Cron value that marks a blueprint as manually triggered
pub const MANUAL_CRON: &str = "manual";

/// Blueprint definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: Uuid,
    pub name: String,
    pub mode: BlueprintMode,
    /// Project owning this blueprint. Empty means none.
    #[serde(default)]
    pub project_name: String,
    pub cron_config: String,
    pub is_manual: bool,
    pub enable: bool,
    #[serde(default)]
    pub connections: Vec<BlueprintConnection>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub sync_policy: SyncPolicy,
    #[serde(default)]
    pub before_plan: PipelinePlan,
    #[serde(default)]
    pub after_plan: PipelinePlan,
    /// Derived in NORMAL mode, authored in ADVANCED mode
    #[serde(default)]
    pub plan: PipelinePlan,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blueprint {
    pub fn has_project(&self) -> bool {
        !self.project_name.is_empty()
    }

    /// Whether the cron field asks for manual triggering only
    pub fn is_manual_cron(&self) -> bool {
        self.cron_config.eq_ignore_ascii_case(MANUAL_CRON)
    }

    /// Whether the scheduler should register a cron job for this blueprint
    pub fn is_schedulable(&self) -> bool {
        self.enable && !self.is_manual
    }
}

/// How a blueprint's plan is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlueprintMode {
    /// Plan generated from connections and project metric settings
    Normal,
    /// Plan authored directly by the user
    Advanced,
}

impl BlueprintMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintMode::Normal => "NORMAL",
            BlueprintMode::Advanced => "ADVANCED",
        }
    }
}

impl std::fmt::Display for BlueprintMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlueprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(BlueprintMode::Normal),
            "ADVANCED" => Ok(BlueprintMode::Advanced),
            other => Err(format!("unknown blueprint mode: {}", other)),
        }
    }
}

/// A data-source connection and the scopes collected from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintConnection {
    pub plugin_name: String,
    pub connection_id: u64,
    #[serde(default)]
    pub scopes: Vec<BlueprintScope>,
}

/// A scope (repository, board, project...) inside a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintScope {
    pub scope_id: String,
    /// Domain types to collect. Empty means every domain type.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl BlueprintScope {
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            entities: Vec::new(),
        }
    }
}

/// Per-run collection policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPolicy {
    #[serde(default)]
    pub skip_on_fail: bool,
    /// Re-collect everything instead of collecting incrementally
    #[serde(default)]
    pub full_sync: bool,
    /// Reuse raw data already collected and only extract / convert
    #[serde(default)]
    pub skip_collectors: bool,
    #[serde(default)]
    pub time_after: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&BlueprintMode::Advanced).unwrap(),
            "\"ADVANCED\""
        );
        let mode: BlueprintMode = serde_json::from_str("\"NORMAL\"").unwrap();
        assert_eq!(mode, BlueprintMode::Normal);
        assert_eq!("advanced".parse::<BlueprintMode>(), Ok(BlueprintMode::Advanced));
        assert!("weird".parse::<BlueprintMode>().is_err());
    }

    #[test]
    fn test_sync_policy_defaults() {
        let policy: SyncPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, SyncPolicy::default());
        assert!(!policy.skip_collectors);
        assert!(policy.time_after.is_none());
    }

    #[test]
    fn test_manual_cron_detection() {
        let now = Utc::now();
        let mut blueprint = Blueprint {
            id: Uuid::new_v4(),
            name: "bp".to_string(),
            mode: BlueprintMode::Normal,
            project_name: String::new(),
            cron_config: "Manual".to_string(),
            is_manual: false,
            enable: true,
            connections: vec![],
            labels: vec![],
            sync_policy: SyncPolicy::default(),
            before_plan: PipelinePlan::new(),
            after_plan: PipelinePlan::new(),
            plan: PipelinePlan::new(),
            created_at: now,
            updated_at: now,
        };
        assert!(blueprint.is_manual_cron());
        assert!(!blueprint.has_project());

        // The whole value must match
        blueprint.cron_config = " manual ".to_string();
        assert!(!blueprint.is_manual_cron());
        blueprint.cron_config = "MANUAL".to_string();
        assert!(blueprint.is_manual_cron());

        blueprint.cron_config = "0 0 * * *".to_string();
        assert!(!blueprint.is_manual_cron());
        assert!(blueprint.is_schedulable());

        blueprint.enable = false;
        assert!(!blueprint.is_schedulable());
    }
}
