//! In-memory store
//!
//! Keeps blueprints, projects and submitted pipelines in process memory.
//! Used by `--in-memory` deployments and by the test suite.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tributary_core::domain::blueprint::Blueprint;
use tributary_core::domain::pipeline::{Pipeline, PipelineStatus};
use tributary_core::domain::project::{Project, ProjectMetricSetting};
use tributary_core::dto::blueprint::BlueprintQuery;
use tributary_core::dto::pipeline::NewPipeline;
use uuid::Uuid;

use crate::error::StoreError;
use crate::repository::{BlueprintStore, PipelineExecutor, StoreResult};

#[derive(Default)]
struct State {
    blueprints: BTreeMap<Uuid, Blueprint>,
    projects: HashMap<String, Project>,
    metrics: Vec<ProjectMetricSetting>,
    pipelines: Vec<Pipeline>,
}

/// Store and pipeline queue kept in memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Registers a project so blueprints can reference it
    pub fn insert_project(&self, name: impl Into<String>) -> StoreResult<Project> {
        let project = Project {
            name: name.into(),
            description: None,
            created_at: chrono::Utc::now(),
        };
        self.write()?
            .projects
            .insert(project.name.clone(), project.clone());
        Ok(project)
    }

    /// Adds or replaces the metric setting of a project plugin
    pub fn upsert_metric_setting(&self, setting: ProjectMetricSetting) -> StoreResult<()> {
        let mut state = self.write()?;
        state.metrics.retain(|m| {
            !(m.project_name == setting.project_name && m.plugin_name == setting.plugin_name)
        });
        state.metrics.push(setting);
        Ok(())
    }

    /// Pipelines submitted so far, oldest first
    pub fn pipelines(&self) -> StoreResult<Vec<Pipeline>> {
        Ok(self.read()?.pipelines.clone())
    }
}

#[async_trait]
impl BlueprintStore for MemoryStore {
    async fn find_blueprints(&self, query: &BlueprintQuery) -> StoreResult<(Vec<Blueprint>, i64)> {
        let state = self.read()?;

        let mut matching: Vec<&Blueprint> = state
            .blueprints
            .values()
            .filter(|b| query.matches(b))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let count = matching.len() as i64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query.limit().map_or(usize::MAX, |l| l as usize);

        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, count))
    }

    async fn find_blueprint(&self, id: Uuid) -> StoreResult<Option<Blueprint>> {
        Ok(self.read()?.blueprints.get(&id).cloned())
    }

    async fn find_blueprint_by_project(
        &self,
        project_name: &str,
    ) -> StoreResult<Option<Blueprint>> {
        Ok(self
            .read()?
            .blueprints
            .values()
            .find(|b| b.project_name == project_name)
            .cloned())
    }

    async fn save_blueprint(&self, blueprint: &Blueprint) -> StoreResult<()> {
        let mut state = self.write()?;

        if blueprint.has_project() {
            let taken = state
                .blueprints
                .values()
                .any(|b| b.id != blueprint.id && b.project_name == blueprint.project_name);
            if taken {
                return Err(StoreError::Constraint(format!(
                    "project_name {} is already used",
                    blueprint.project_name
                )));
            }
        }

        state.blueprints.insert(blueprint.id, blueprint.clone());
        Ok(())
    }

    async fn delete_blueprint(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.write()?.blueprints.remove(&id).is_some())
    }

    async fn find_project(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(self.read()?.projects.get(name).cloned())
    }

    async fn find_project_metrics(
        &self,
        project_name: &str,
    ) -> StoreResult<Vec<ProjectMetricSetting>> {
        let state = self.read()?;
        let mut metrics: Vec<ProjectMetricSetting> = state
            .metrics
            .iter()
            .filter(|m| m.project_name == project_name && m.enable)
            .cloned()
            .collect();
        metrics.sort_by(|a, b| a.plugin_name.cmp(&b.plugin_name));
        Ok(metrics)
    }
}

#[async_trait]
impl PipelineExecutor for MemoryStore {
    async fn submit_pipeline(&self, req: NewPipeline) -> StoreResult<Pipeline> {
        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            total_tasks: req.plan.task_count(),
            name: req.name,
            blueprint_id: req.blueprint_id,
            plan: req.plan,
            labels: req.labels,
            sync_policy: req.sync_policy,
            status: PipelineStatus::Created,
            created_at: chrono::Utc::now(),
        };
        self.write()?.pipelines.push(pipeline.clone());
        Ok(pipeline)
    }
}
