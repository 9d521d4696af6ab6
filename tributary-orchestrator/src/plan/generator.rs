//! Standard plan generator
//!
//! Expands connections through their data-source plugins, adds one plan per
//! enabled metric plugin, and prepends the project mapping.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tributary_core::domain::blueprint::BlueprintConnection;
use tributary_core::domain::plan::{PipelinePlan, parallelize, sequentialize};

use super::PlanGenerator;
use super::catalog::builtin_registry;
use super::plugin::PluginRegistry;
use crate::error::PlanError;

/// Plan generator backed by a [`PluginRegistry`]
pub struct StandardPlanGenerator {
    registry: PluginRegistry,
}

impl StandardPlanGenerator {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    /// Generator over the built-in plugins
    pub fn builtin() -> Self {
        Self::new(builtin_registry())
    }
}

#[async_trait]
impl PlanGenerator for StandardPlanGenerator {
    async fn generate_plan(
        &self,
        project_name: &str,
        connections: &[BlueprintConnection],
        metrics: &BTreeMap<String, JsonValue>,
        skip_collectors: bool,
    ) -> Result<PipelinePlan, PlanError> {
        let mut source_plans = Vec::with_capacity(connections.len());
        let mut domain_scopes = Vec::new();

        for connection in connections {
            let plugin = self.registry.data_source(&connection.plugin_name)?;
            if connection.scopes.is_empty() && !plugin.scope_optional() {
                return Err(PlanError::NoScope {
                    plugin: connection.plugin_name.clone(),
                    connection_id: connection.connection_id,
                });
            }

            let (plan, scopes) = plugin.make_pipeline_plan(
                connection.connection_id,
                &connection.scopes,
                skip_collectors,
            )?;
            source_plans.push(plan);
            domain_scopes.extend(scopes);
        }

        let mut metric_plans = Vec::with_capacity(metrics.len());
        for (plugin_name, options) in metrics {
            let plugin = self.registry.metric(plugin_name)?;
            metric_plans.push(plugin.make_metric_plan(project_name, options)?);
        }

        let project_mapping = match self.registry.project_mapper() {
            Some(mapper) if !project_name.is_empty() => {
                mapper.map_project(project_name, &domain_scopes)?
            }
            _ => PipelinePlan::new(),
        };

        tracing::debug!(
            "Generated plan for project '{}': {} connection(s), {} metric plugin(s)",
            project_name,
            connections.len(),
            metrics.len()
        );

        Ok(sequentialize([
            project_mapping,
            parallelize(source_plans),
            parallelize(metric_plans),
        ]))
    }
}
