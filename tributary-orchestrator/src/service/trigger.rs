//! Pipeline Trigger
//!
//! Resolves the plan of a blueprint and hands a new pipeline to the executor.

use std::sync::Arc;
use tributary_core::domain::blueprint::{Blueprint, BlueprintMode, SyncPolicy};
use tributary_core::domain::pipeline::Pipeline;
use tributary_core::dto::pipeline::NewPipeline;

use crate::error::{BlueprintError, Result};
use crate::plan::PlanComposer;
use crate::repository::PipelineExecutor;

#[derive(Clone)]
pub struct PipelineTrigger {
    composer: PlanComposer,
    executor: Arc<dyn PipelineExecutor>,
}

impl PipelineTrigger {
    pub fn new(composer: PlanComposer, executor: Arc<dyn PipelineExecutor>) -> Self {
        Self { composer, executor }
    }

    /// Submits one pipeline run of `blueprint`
    ///
    /// NORMAL blueprints get a freshly generated plan, ADVANCED ones run
    /// their stored plan. A plan with nothing to do yields
    /// [`BlueprintError::EmptyPlan`] and no pipeline.
    pub async fn trigger(&self, blueprint: &Blueprint, sync_policy: &SyncPolicy) -> Result<Pipeline> {
        let plan = match blueprint.mode {
            BlueprintMode::Normal => self
                .composer
                .make_plan_for_blueprint(blueprint, sync_policy)
                .await
                .map_err(|source| BlueprintError::Plan {
                    blueprint_id: blueprint.id,
                    blueprint_name: blueprint.name.clone(),
                    source,
                })?,
            BlueprintMode::Advanced => blueprint.plan.clone(),
        };

        if plan.is_empty() {
            return Err(BlueprintError::EmptyPlan);
        }

        let pipeline = self
            .executor
            .submit_pipeline(NewPipeline {
                name: blueprint.name.clone(),
                blueprint_id: blueprint.id,
                plan,
                labels: blueprint.labels.clone(),
                sync_policy: sync_policy.clone(),
            })
            .await
            .map_err(|source| BlueprintError::Submit {
                blueprint_id: blueprint.id,
                blueprint_name: blueprint.name.clone(),
                source,
            })?;

        tracing::info!(
            "Pipeline {} submitted for blueprint {} ({})",
            pipeline.id,
            blueprint.name,
            blueprint.id
        );

        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlanError, StoreError};
    use crate::plan::PlanGenerator;
    use crate::repository::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::Value as JsonValue;
    use std::collections::BTreeMap;
    use tributary_core::domain::blueprint::BlueprintConnection;
    use tributary_core::domain::plan::{PipelinePlan, PipelineTask};
    use uuid::Uuid;

    /// Generator returning tasks of the given plugins, or failing when None
    struct FixedGenerator(Option<Vec<&'static str>>);

    #[async_trait]
    impl PlanGenerator for FixedGenerator {
        async fn generate_plan(
            &self,
            _project_name: &str,
            _connections: &[BlueprintConnection],
            _metrics: &BTreeMap<String, JsonValue>,
            _skip_collectors: bool,
        ) -> std::result::Result<PipelinePlan, PlanError> {
            match &self.0 {
                Some(plugins) => Ok(PipelinePlan(vec![
                    plugins.iter().map(|p| PipelineTask::new(*p)).collect(),
                ])),
                None => Err(PlanError::UnknownPlugin("gitee".to_string())),
            }
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl PipelineExecutor for FailingExecutor {
        async fn submit_pipeline(&self, _req: NewPipeline) -> crate::repository::StoreResult<Pipeline> {
            Err(StoreError::Unavailable("queue down".to_string()))
        }
    }

    fn setup(generator: FixedGenerator) -> (Arc<MemoryStore>, PipelineTrigger) {
        let store = Arc::new(MemoryStore::new());
        let composer = PlanComposer::new(store.clone(), Arc::new(generator));
        let trigger = PipelineTrigger::new(composer, store.clone());
        (store, trigger)
    }

    fn blueprint(mode: BlueprintMode, plan: PipelinePlan) -> Blueprint {
        let now = Utc::now();
        Blueprint {
            id: Uuid::new_v4(),
            name: "nightly".to_string(),
            mode,
            project_name: String::new(),
            cron_config: "0 0 * * *".to_string(),
            is_manual: false,
            enable: true,
            connections: vec![],
            labels: vec!["team-a".to_string()],
            sync_policy: SyncPolicy::default(),
            before_plan: PipelinePlan::new(),
            after_plan: PipelinePlan::new(),
            plan,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_normal_regenerates_plan() {
        let (store, trigger) = setup(FixedGenerator(Some(vec!["github"])));
        // The stored plan is stale and ignored
        let bp = blueprint(
            BlueprintMode::Normal,
            PipelinePlan(vec![vec![PipelineTask::new("jira")]]),
        );
        let policy = SyncPolicy {
            full_sync: true,
            ..Default::default()
        };

        let pipeline = trigger.trigger(&bp, &policy).await.unwrap();

        assert_eq!(pipeline.plan.stages()[0][0].plugin, "github");
        assert_eq!(pipeline.blueprint_id, bp.id);
        assert_eq!(pipeline.labels, bp.labels);
        assert!(pipeline.sync_policy.full_sync);
        assert_eq!(store.pipelines().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_advanced_uses_stored_plan() {
        let (_, trigger) = setup(FixedGenerator(None));
        let bp = blueprint(
            BlueprintMode::Advanced,
            PipelinePlan(vec![vec![PipelineTask::new("jenkins")]]),
        );

        let pipeline = trigger.trigger(&bp, &SyncPolicy::default()).await.unwrap();
        assert_eq!(pipeline.plan, bp.plan);
    }

    #[tokio::test]
    async fn test_structural_only_plan_is_empty() {
        let (store, trigger) = setup(FixedGenerator(Some(vec!["org", "dora"])));
        let bp = blueprint(BlueprintMode::Normal, PipelinePlan::new());

        let err = trigger.trigger(&bp, &SyncPolicy::default()).await.unwrap_err();

        assert!(err.is_empty_plan());
        assert!(store.pipelines().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plan_failure_creates_nothing() {
        let (store, trigger) = setup(FixedGenerator(None));
        let bp = blueprint(BlueprintMode::Normal, PipelinePlan::new());

        let err = trigger.trigger(&bp, &SyncPolicy::default()).await.unwrap_err();

        assert!(matches!(err, BlueprintError::Plan { .. }));
        assert!(store.pipelines().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_names_blueprint() {
        let store = Arc::new(MemoryStore::new());
        let composer = PlanComposer::new(store, Arc::new(FixedGenerator(Some(vec!["github"]))));
        let trigger = PipelineTrigger::new(composer, Arc::new(FailingExecutor));
        let bp = blueprint(BlueprintMode::Normal, PipelinePlan::new());

        let err = trigger.trigger(&bp, &SyncPolicy::default()).await.unwrap_err();

        assert!(matches!(err, BlueprintError::Submit { .. }));
        assert!(err.to_string().contains("nightly"));
    }
}
