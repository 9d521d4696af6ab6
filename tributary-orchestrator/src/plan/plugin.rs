//! Plugin contracts used by plan generation
//!
//! Plugins are only known here through the metadata that decides which
//! tasks a plan contains. Their API clients live elsewhere.

use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Arc;
use tributary_core::domain::blueprint::BlueprintScope;
use tributary_core::domain::plan::{PipelinePlan, PipelineTask};

use crate::error::PlanError;

pub const DOMAIN_TYPE_CODE: &str = "CODE";
pub const DOMAIN_TYPE_TICKET: &str = "TICKET";
pub const DOMAIN_TYPE_CODE_REVIEW: &str = "CODEREVIEW";
pub const DOMAIN_TYPE_CROSS: &str = "CROSS";
pub const DOMAIN_TYPE_CICD: &str = "CICD";
pub const DOMAIN_TYPE_CODE_QUALITY: &str = "CODEQUALITY";

/// A domain-layer row touched by a scope, used for project mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    pub table: String,
    pub row_id: String,
}

/// Plugin that collects data from a third-party tool
pub trait DataSourcePlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Connections of scope-less plugins (webhooks...) may declare no scope
    fn scope_optional(&self) -> bool {
        false
    }

    /// Expands a connection and its scopes into a plan
    fn make_pipeline_plan(
        &self,
        connection_id: u64,
        scopes: &[BlueprintScope],
        skip_collectors: bool,
    ) -> Result<(PipelinePlan, Vec<DomainScope>), PlanError>;
}

/// Plugin that computes metrics over a project's collected data
pub trait MetricPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn make_metric_plan(
        &self,
        project_name: &str,
        options: &JsonValue,
    ) -> Result<PipelinePlan, PlanError>;
}

/// Produces the plan linking a project to the domain scopes it owns
pub trait ProjectMapper: Send + Sync {
    fn map_project(
        &self,
        project_name: &str,
        scopes: &[DomainScope],
    ) -> Result<PipelinePlan, PlanError>;
}

// =============================================================================
// Subtask-driven data sources
// =============================================================================

/// Position of a subtask in the collect / extract / convert chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskKind {
    Collector,
    Extractor,
    Converter,
    Enricher,
}

/// Static description of one plugin subtask
#[derive(Debug, Clone)]
pub struct SubtaskMeta {
    pub name: &'static str,
    pub kind: SubtaskKind,
    pub enabled_by_default: bool,
    pub domain_types: &'static [&'static str],
}

impl SubtaskMeta {
    pub const fn new(
        name: &'static str,
        kind: SubtaskKind,
        domain_types: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind,
            enabled_by_default: true,
            domain_types,
        }
    }

    pub const fn disabled(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }
}

/// Subtasks to run for the wanted entities, in declaration order
///
/// An empty `entities` list selects every domain type.
pub fn select_subtasks(
    metas: &[SubtaskMeta],
    entities: &[String],
    skip_collectors: bool,
) -> Vec<String> {
    metas
        .iter()
        .filter(|meta| meta.enabled_by_default)
        .filter(|meta| !(skip_collectors && meta.kind == SubtaskKind::Collector))
        .filter(|meta| {
            entities.is_empty()
                || meta
                    .domain_types
                    .iter()
                    .any(|domain| entities.iter().any(|e| e == domain))
        })
        .map(|meta| meta.name.to_string())
        .collect()
}

/// Data source whose plan is derived from its subtask metadata
///
/// Each scope becomes one task; all tasks of a connection share one stage.
pub struct SubtaskPlugin {
    name: String,
    subtasks: Vec<SubtaskMeta>,
    /// Domain table written for each domain type
    domain_tables: Vec<(&'static str, &'static str)>,
    scope_optional: bool,
}

impl SubtaskPlugin {
    pub fn new(name: impl Into<String>, subtasks: Vec<SubtaskMeta>) -> Self {
        Self {
            name: name.into(),
            subtasks,
            domain_tables: Vec::new(),
            scope_optional: false,
        }
    }

    pub fn with_domain_table(mut self, domain_type: &'static str, table: &'static str) -> Self {
        self.domain_tables.push((domain_type, table));
        self
    }

    pub fn scope_optional(mut self) -> Self {
        self.scope_optional = true;
        self
    }

    fn domain_scopes(&self, connection_id: u64, scope: &BlueprintScope) -> Vec<DomainScope> {
        self.domain_tables
            .iter()
            .filter(|(domain, _)| {
                scope.entities.is_empty() || scope.entities.iter().any(|e| e == domain)
            })
            .map(|(_, table)| DomainScope {
                table: table.to_string(),
                row_id: format!("{}:{}:{}", self.name, connection_id, scope.scope_id),
            })
            .collect()
    }
}

impl DataSourcePlugin for SubtaskPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope_optional(&self) -> bool {
        self.scope_optional
    }

    fn make_pipeline_plan(
        &self,
        connection_id: u64,
        scopes: &[BlueprintScope],
        skip_collectors: bool,
    ) -> Result<(PipelinePlan, Vec<DomainScope>), PlanError> {
        if scopes.is_empty() {
            let task = PipelineTask::new(self.name.clone())
                .with_subtasks(select_subtasks(&self.subtasks, &[], skip_collectors))
                .with_option("connectionId", json!(connection_id));
            return Ok((PipelinePlan(vec![vec![task]]), Vec::new()));
        }

        let mut stage = Vec::with_capacity(scopes.len());
        let mut domain_scopes = Vec::new();
        for scope in scopes {
            let subtasks = select_subtasks(&self.subtasks, &scope.entities, skip_collectors);
            stage.push(
                PipelineTask::new(self.name.clone())
                    .with_subtasks(subtasks)
                    .with_option("connectionId", json!(connection_id))
                    .with_option("scopeId", json!(scope.scope_id)),
            );
            domain_scopes.extend(self.domain_scopes(connection_id, scope));
        }

        Ok((PipelinePlan(vec![stage]), domain_scopes))
    }
}

// =============================================================================
// Metric plugins and project mapping
// =============================================================================

/// Metric plugin running as a single task fed with the project settings
pub struct ProjectMetricPlugin {
    name: String,
}

impl ProjectMetricPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MetricPlugin for ProjectMetricPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_metric_plan(
        &self,
        project_name: &str,
        options: &JsonValue,
    ) -> Result<PipelinePlan, PlanError> {
        let mut task = PipelineTask::new(self.name.clone());
        match options {
            JsonValue::Null => {}
            JsonValue::Object(map) => task.options.extend(map.clone()),
            other => {
                return Err(PlanError::InvalidOptions {
                    plugin: self.name.clone(),
                    message: format!("expected an object, got {}", other),
                });
            }
        }
        task.options
            .insert("projectName".to_string(), json!(project_name));

        Ok(PipelinePlan(vec![vec![task]]))
    }
}

/// Project mapper emitting an `org` task
pub struct OrgProjectMapper;

impl ProjectMapper for OrgProjectMapper {
    fn map_project(
        &self,
        project_name: &str,
        scopes: &[DomainScope],
    ) -> Result<PipelinePlan, PlanError> {
        let scopes: Vec<JsonValue> = scopes
            .iter()
            .map(|s| json!({ "table": s.table, "rowId": s.row_id }))
            .collect();

        let task = PipelineTask::new("org")
            .with_subtasks(vec!["setProjectMapping".to_string()])
            .with_option(
                "projectMappings",
                json!([{ "projectName": project_name, "scopes": scopes }]),
            );

        Ok(PipelinePlan(vec![vec![task]]))
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Plugins known to the plan generator, looked up by name
#[derive(Default, Clone)]
pub struct PluginRegistry {
    data_sources: HashMap<String, Arc<dyn DataSourcePlugin>>,
    metrics: HashMap<String, Arc<dyn MetricPlugin>>,
    project_mapper: Option<Arc<dyn ProjectMapper>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_data_source(&mut self, plugin: impl DataSourcePlugin + 'static) {
        self.data_sources
            .insert(plugin.name().to_string(), Arc::new(plugin));
    }

    pub fn register_metric(&mut self, plugin: impl MetricPlugin + 'static) {
        self.metrics
            .insert(plugin.name().to_string(), Arc::new(plugin));
    }

    pub fn set_project_mapper(&mut self, mapper: impl ProjectMapper + 'static) {
        self.project_mapper = Some(Arc::new(mapper));
    }

    pub fn data_source(&self, name: &str) -> Result<Arc<dyn DataSourcePlugin>, PlanError> {
        if let Some(plugin) = self.data_sources.get(name) {
            return Ok(Arc::clone(plugin));
        }
        if self.metrics.contains_key(name) {
            return Err(PlanError::Unsupported {
                plugin: name.to_string(),
                capability: "data source blueprints",
            });
        }
        Err(PlanError::UnknownPlugin(name.to_string()))
    }

    pub fn metric(&self, name: &str) -> Result<Arc<dyn MetricPlugin>, PlanError> {
        if let Some(plugin) = self.metrics.get(name) {
            return Ok(Arc::clone(plugin));
        }
        if self.data_sources.contains_key(name) {
            return Err(PlanError::Unsupported {
                plugin: name.to_string(),
                capability: "metric blueprints",
            });
        }
        Err(PlanError::UnknownPlugin(name.to_string()))
    }

    pub fn project_mapper(&self) -> Option<Arc<dyn ProjectMapper>> {
        self.project_mapper.clone()
    }

    pub fn data_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data_sources.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METAS: &[SubtaskMeta] = &[
        SubtaskMeta::new("collectIssues", SubtaskKind::Collector, &[DOMAIN_TYPE_TICKET]),
        SubtaskMeta::new("extractIssues", SubtaskKind::Extractor, &[DOMAIN_TYPE_TICKET]),
        SubtaskMeta::new("collectCommits", SubtaskKind::Collector, &[DOMAIN_TYPE_CODE]),
        SubtaskMeta::new("convertIssues", SubtaskKind::Converter, &[DOMAIN_TYPE_TICKET]),
        SubtaskMeta::new("collectAccounts", SubtaskKind::Collector, &[DOMAIN_TYPE_CROSS])
            .disabled(),
    ];

    #[test]
    fn test_select_subtasks_by_entities() {
        let subtasks = select_subtasks(METAS, &["TICKET".to_string()], false);
        assert_eq!(
            subtasks,
            vec!["collectIssues", "extractIssues", "convertIssues"]
        );
    }

    #[test]
    fn test_select_subtasks_all_entities_skips_disabled() {
        let subtasks = select_subtasks(METAS, &[], false);
        assert_eq!(subtasks.len(), 4);
        assert!(!subtasks.contains(&"collectAccounts".to_string()));
    }

    #[test]
    fn test_select_subtasks_skip_collectors() {
        let subtasks = select_subtasks(METAS, &[], true);
        assert_eq!(subtasks, vec!["extractIssues", "convertIssues"]);
    }

    #[test]
    fn test_subtask_plugin_one_task_per_scope() {
        let plugin = SubtaskPlugin::new("jira", METAS.to_vec())
            .with_domain_table(DOMAIN_TYPE_TICKET, "boards");
        let scopes = vec![BlueprintScope::new("10"), BlueprintScope::new("11")];

        let (plan, domain_scopes) = plugin.make_pipeline_plan(3, &scopes, false).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.task_count(), 2);
        let task = &plan.stages()[0][1];
        assert_eq!(task.plugin, "jira");
        assert_eq!(task.options["connectionId"], 3);
        assert_eq!(task.options["scopeId"], "11");
        assert_eq!(
            domain_scopes,
            vec![
                DomainScope {
                    table: "boards".to_string(),
                    row_id: "jira:3:10".to_string()
                },
                DomainScope {
                    table: "boards".to_string(),
                    row_id: "jira:3:11".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_metric_plugin_merges_options() {
        let plugin = ProjectMetricPlugin::new("dora");
        let plan = plugin
            .make_metric_plan("X", &json!({ "window": 30 }))
            .unwrap();
        let task = &plan.stages()[0][0];
        assert_eq!(task.options["window"], 30);
        assert_eq!(task.options["projectName"], "X");

        let err = plugin.make_metric_plan("X", &json!([1, 2])).unwrap_err();
        assert!(matches!(err, PlanError::InvalidOptions { .. }));
    }

    #[test]
    fn test_org_mapper_lists_scopes() {
        let plan = OrgProjectMapper
            .map_project(
                "X",
                &[DomainScope {
                    table: "repos".to_string(),
                    row_id: "github:1:42".to_string(),
                }],
            )
            .unwrap();
        let task = &plan.stages()[0][0];
        assert_eq!(task.plugin, "org");
        assert_eq!(
            task.options["projectMappings"][0]["scopes"][0]["rowId"],
            "github:1:42"
        );
    }

    #[test]
    fn test_registry_lookup_errors() {
        let mut registry = PluginRegistry::new();
        registry.register_data_source(SubtaskPlugin::new("jira", METAS.to_vec()));
        registry.register_metric(ProjectMetricPlugin::new("dora"));

        assert!(registry.data_source("jira").is_ok());
        assert!(matches!(
            registry.data_source("dora"),
            Err(PlanError::Unsupported { .. })
        ));
        assert!(matches!(
            registry.metric("gitee"),
            Err(PlanError::UnknownPlugin(_))
        ));
        assert_eq!(registry.data_source_names(), vec!["jira".to_string()]);
    }
}
