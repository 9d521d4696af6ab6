//! Plan composition
//!
//! Turns a blueprint into the pipeline plan that will be submitted: the
//! generated part comes from a [`PlanGenerator`], wrapped by the blueprint's
//! own before and after plans.

pub mod catalog;
pub mod generator;
pub mod plugin;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tributary_core::domain::blueprint::{Blueprint, BlueprintConnection, SyncPolicy};
use tributary_core::domain::plan::{PipelinePlan, sequentialize};

use crate::error::PlanError;
use crate::repository::BlueprintStore;

pub use generator::StandardPlanGenerator;

/// Expands connections and project metrics into a plan
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// `metrics` maps each enabled metric plugin to its raw options
    async fn generate_plan(
        &self,
        project_name: &str,
        connections: &[BlueprintConnection],
        metrics: &BTreeMap<String, JsonValue>,
        skip_collectors: bool,
    ) -> Result<PipelinePlan, PlanError>;
}

/// Builds the full plan of a blueprint
#[derive(Clone)]
pub struct PlanComposer {
    store: Arc<dyn BlueprintStore>,
    generator: Arc<dyn PlanGenerator>,
}

impl PlanComposer {
    pub fn new(store: Arc<dyn BlueprintStore>, generator: Arc<dyn PlanGenerator>) -> Self {
        Self { store, generator }
    }

    /// Generated plan of `blueprint`, between its before and after plans
    pub async fn make_plan_for_blueprint(
        &self,
        blueprint: &Blueprint,
        sync_policy: &SyncPolicy,
    ) -> Result<PipelinePlan, PlanError> {
        let mut metrics = BTreeMap::new();
        if blueprint.has_project() {
            for setting in self.store.find_project_metrics(&blueprint.project_name).await? {
                metrics.insert(setting.plugin_name, setting.plugin_option);
            }
        }

        let generated = self
            .generator
            .generate_plan(
                &blueprint.project_name,
                &blueprint.connections,
                &metrics,
                sync_policy.skip_collectors,
            )
            .await?;

        Ok(sequentialize([
            blueprint.before_plan.clone(),
            generated,
            blueprint.after_plan.clone(),
        ]))
    }
}
