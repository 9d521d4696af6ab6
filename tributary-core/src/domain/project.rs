//! Project domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project groups the data of several scopes under one name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metric plugin enabled for a project, with its raw options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetricSetting {
    pub project_name: String,
    pub plugin_name: String,
    pub plugin_option: serde_json::Value,
    pub enable: bool,
}
