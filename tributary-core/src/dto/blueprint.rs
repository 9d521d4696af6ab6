//! Blueprint DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::blueprint::{
    Blueprint, BlueprintConnection, BlueprintMode, MANUAL_CRON, SyncPolicy,
};
use crate::domain::plan::PipelinePlan;

/// Request to create a new blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlueprint {
    pub name: String,
    pub mode: BlueprintMode,
    #[serde(default)]
    pub project_name: String,
    #[serde(default = "default_cron")]
    pub cron_config: String,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default = "default_enable")]
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
    /// Only meaningful in ADVANCED mode
    #[serde(default)]
    pub plan: PipelinePlan,
}

fn default_cron() -> String {
    MANUAL_CRON.to_string()
}

fn default_enable() -> bool {
    true
}

impl CreateBlueprint {
    /// Builds the blueprint record, assigning its identity and timestamps
    pub fn into_blueprint(self, id: Uuid, now: DateTime<Utc>) -> Blueprint {
        let plan = match self.mode {
            BlueprintMode::Advanced => self.plan,
            BlueprintMode::Normal => PipelinePlan::new(),
        };
        Blueprint {
            id,
            name: self.name,
            mode: self.mode,
            project_name: self.project_name,
            cron_config: self.cron_config,
            is_manual: self.is_manual,
            enable: self.enable,
            connections: self.connections,
            labels: self.labels,
            sync_policy: self.sync_policy,
            before_plan: self.before_plan,
            after_plan: self.after_plan,
            plan,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a blueprint
///
/// Only the fields listed here can be patched. The mode is fixed at creation
/// and deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchBlueprint {
    pub name: Option<String>,
    pub project_name: Option<String>,
    pub cron_config: Option<String>,
    pub is_manual: Option<bool>,
    pub enable: Option<bool>,
    pub connections: Option<Vec<BlueprintConnection>>,
    pub labels: Option<Vec<String>>,
    pub sync_policy: Option<PatchSyncPolicy>,
    pub before_plan: Option<PipelinePlan>,
    pub after_plan: Option<PipelinePlan>,
    /// Authored plan, accepted for ADVANCED blueprints only
    pub plan: Option<PipelinePlan>,
}

impl PatchBlueprint {
    /// Merges the present fields into `blueprint`
    pub fn apply_to(self, blueprint: &mut Blueprint, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            blueprint.name = name;
        }
        if let Some(project_name) = self.project_name {
            blueprint.project_name = project_name;
        }
        if let Some(cron_config) = self.cron_config {
            blueprint.cron_config = cron_config;
        }
        if let Some(is_manual) = self.is_manual {
            blueprint.is_manual = is_manual;
        }
        if let Some(enable) = self.enable {
            blueprint.enable = enable;
        }
        if let Some(connections) = self.connections {
            blueprint.connections = connections;
        }
        if let Some(labels) = self.labels {
            blueprint.labels = labels;
        }
        if let Some(sync_policy) = self.sync_policy {
            sync_policy.apply_to(&mut blueprint.sync_policy);
        }
        if let Some(before_plan) = self.before_plan {
            blueprint.before_plan = before_plan;
        }
        if let Some(after_plan) = self.after_plan {
            blueprint.after_plan = after_plan;
        }
        if let Some(plan) = self.plan {
            blueprint.plan = plan;
        }
        blueprint.updated_at = now;
    }
}

/// Partial update of a [`SyncPolicy`], merged field by field
///
/// `time_after` tells an explicit `null` (clear it) from an absent key
/// (keep it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchSyncPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_on_fail: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_collectors: Option<bool>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_after: Option<Option<DateTime<Utc>>>,
}

impl PatchSyncPolicy {
    pub fn apply_to(self, policy: &mut SyncPolicy) {
        if let Some(skip_on_fail) = self.skip_on_fail {
            policy.skip_on_fail = skip_on_fail;
        }
        if let Some(full_sync) = self.full_sync {
            policy.full_sync = full_sync;
        }
        if let Some(skip_collectors) = self.skip_collectors {
            policy.skip_collectors = skip_collectors;
        }
        if let Some(time_after) = self.time_after {
            policy.time_after = time_after;
        }
    }
}

/// Marks a key that is present, even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Schedule category used to filter blueprint listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlueprintType {
    #[default]
    All,
    Manual,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Cron expressions behind the predefined schedule categories
pub const DAILY_CRON: &str = "0 0 * * *";
pub const WEEKLY_CRON: &str = "0 0 * * 1";
pub const MONTHLY_CRON: &str = "0 0 1 * *";

impl BlueprintType {
    /// Cron expression matched by a predefined category
    pub fn cron(&self) -> Option<&'static str> {
        match self {
            BlueprintType::Daily => Some(DAILY_CRON),
            BlueprintType::Weekly => Some(WEEKLY_CRON),
            BlueprintType::Monthly => Some(MONTHLY_CRON),
            _ => None,
        }
    }

    /// Whether `blueprint` belongs to this category
    pub fn matches(&self, blueprint: &Blueprint) -> bool {
        match self {
            BlueprintType::All => true,
            BlueprintType::Manual => blueprint.is_manual,
            BlueprintType::Daily | BlueprintType::Weekly | BlueprintType::Monthly => {
                !blueprint.is_manual && Some(blueprint.cron_config.as_str()) == self.cron()
            }
            BlueprintType::Custom => {
                !blueprint.is_manual
                    && ![DAILY_CRON, WEEKLY_CRON, MONTHLY_CRON]
                        .contains(&blueprint.cron_config.as_str())
            }
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Blueprint listing filter
///
/// `blueprint_type` is only applied when `is_manual` is not set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlueprintQuery {
    pub enable: Option<bool>,
    pub is_manual: Option<bool>,
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub blueprint_type: BlueprintType,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl BlueprintQuery {
    /// Query used by the scheduler: every enabled, cron-driven blueprint
    pub fn schedulable() -> Self {
        Self {
            enable: Some(true),
            is_manual: Some(false),
            ..Default::default()
        }
    }

    /// Page size, `None` meaning no pagination
    pub fn limit(&self) -> Option<u32> {
        match (self.page, self.page_size) {
            (None, None) => None,
            (_, size) => Some(size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)),
        }
    }

    /// Number of records to skip
    ///
    /// Computed in 64 bits: any `u32` page times the page size fits.
    pub fn offset(&self) -> u64 {
        match self.limit() {
            Some(limit) => {
                let page = self.page.unwrap_or(1).max(1);
                u64::from(page - 1) * u64::from(limit)
            }
            None => 0,
        }
    }

    /// Whether `blueprint` passes every filter of this query
    pub fn matches(&self, blueprint: &Blueprint) -> bool {
        if self.enable.is_some_and(|enable| blueprint.enable != enable) {
            return false;
        }
        if let Some(label) = &self.label {
            if !blueprint.labels.iter().any(|l| l == label) {
                return false;
            }
        }
        match self.is_manual {
            Some(is_manual) => blueprint.is_manual == is_manual,
            None => self.blueprint_type.matches(blueprint),
        }
    }
}

/// Paginated blueprint listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintList {
    pub blueprints: Vec<Blueprint>,
    pub count: i64,
}
