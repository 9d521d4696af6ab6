//! Blueprint Service
//!
//! Validates blueprints, persists them and keeps the schedule reconciled
//! after every change.

use std::sync::Arc;
use tributary_core::domain::blueprint::{Blueprint, BlueprintMode, SyncPolicy};
use tributary_core::domain::pipeline::Pipeline;
use tributary_core::dto::blueprint::{BlueprintList, BlueprintQuery, CreateBlueprint, PatchBlueprint};
use uuid::Uuid;

use crate::error::{BlueprintError, Result, StoreError};
use crate::plan::{PlanComposer, PlanGenerator};
use crate::repository::{BlueprintStore, PipelineExecutor};
use crate::scheduler::cron::{CronEngine, parse_standard};
use crate::scheduler::{BlueprintScheduler, ScheduledBlueprint};
use crate::service::trigger::PipelineTrigger;

const MAX_NAME_LEN: usize = 255;

pub struct BlueprintService {
    store: Arc<dyn BlueprintStore>,
    composer: PlanComposer,
    trigger: PipelineTrigger,
    scheduler: BlueprintScheduler,
}

impl BlueprintService {
    pub fn new(
        store: Arc<dyn BlueprintStore>,
        generator: Arc<dyn PlanGenerator>,
        executor: Arc<dyn PipelineExecutor>,
        engine: Box<dyn CronEngine>,
    ) -> Self {
        let composer = PlanComposer::new(store.clone(), generator);
        let trigger = PipelineTrigger::new(composer.clone(), executor);
        let scheduler = BlueprintScheduler::new(store.clone(), trigger.clone(), engine);
        Self {
            store,
            composer,
            trigger,
            scheduler,
        }
    }

    /// Validates a blueprint and, in NORMAL mode, regenerates its plan in place
    pub async fn validate_and_plan(&self, blueprint: &mut Blueprint) -> Result<()> {
        validate_structure(blueprint)?;

        if blueprint.has_project() {
            self.check_project(blueprint).await?;
        }

        if blueprint.is_manual_cron() {
            blueprint.is_manual = true;
        }
        if !blueprint.is_manual {
            parse_standard(&blueprint.cron_config).map_err(BlueprintError::InvalidCron)?;
        }

        match blueprint.mode {
            BlueprintMode::Advanced => {
                if blueprint.plan.has_no_stages() {
                    return Err(BlueprintError::bad_input(
                        "invalid plan: ADVANCED blueprints need a non-empty plan",
                    ));
                }
            }
            BlueprintMode::Normal => {
                let plan = self
                    .composer
                    .make_plan_for_blueprint(blueprint, &blueprint.sync_policy)
                    .await
                    .map_err(|source| BlueprintError::Plan {
                        blueprint_id: blueprint.id,
                        blueprint_name: blueprint.name.clone(),
                        source,
                    })?;
                blueprint.plan = plan;
            }
        }

        Ok(())
    }

    async fn check_project(&self, blueprint: &Blueprint) -> Result<()> {
        let project = self.store.find_project(&blueprint.project_name).await?;
        if project.is_none() {
            return Err(BlueprintError::NotFound(format!(
                "invalid projectName: [{}] for the blueprint [{}]",
                blueprint.project_name, blueprint.name
            )));
        }

        let owner = self
            .store
            .find_blueprint_by_project(&blueprint.project_name)
            .await?;
        match owner {
            Some(owner) if owner.id != blueprint.id => Err(BlueprintError::ProjectConflict {
                project: blueprint.project_name.clone(),
                owner_id: owner.id,
                owner_name: owner.name,
            }),
            _ => Ok(()),
        }
    }

    /// Persists a validated blueprint
    ///
    /// A concurrent write may claim the project between validation and
    /// save; the store's uniqueness check then reports the owner.
    async fn save(&self, blueprint: &Blueprint) -> Result<()> {
        match self.store.save_blueprint(blueprint).await {
            Ok(()) => Ok(()),
            Err(StoreError::Constraint(message)) => {
                let owner = self
                    .store
                    .find_blueprint_by_project(&blueprint.project_name)
                    .await?;
                match owner {
                    Some(owner) if owner.id != blueprint.id => {
                        Err(BlueprintError::ProjectConflict {
                            project: blueprint.project_name.clone(),
                            owner_id: owner.id,
                            owner_name: owner.name,
                        })
                    }
                    _ => Err(BlueprintError::BadInput(message)),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create a new blueprint
    pub async fn create(&self, req: CreateBlueprint) -> Result<Blueprint> {
        let mut blueprint = req.into_blueprint(Uuid::new_v4(), chrono::Utc::now());
        self.validate_and_plan(&mut blueprint).await?;

        self.save(&blueprint).await?;
        tracing::info!("Blueprint created: {} ({})", blueprint.name, blueprint.id);

        self.reload().await?;
        Ok(blueprint)
    }

    /// Get a blueprint by ID
    pub async fn get(&self, id: Uuid) -> Result<Blueprint> {
        self.store
            .find_blueprint(id)
            .await?
            .ok_or_else(|| BlueprintError::NotFound(format!("blueprint {} not found", id)))
    }

    /// List blueprints matching `query`
    pub async fn list(&self, query: &BlueprintQuery) -> Result<BlueprintList> {
        let (blueprints, count) = self.store.find_blueprints(query).await?;
        tracing::debug!("Listed {} of {} blueprint(s)", blueprints.len(), count);
        Ok(BlueprintList { blueprints, count })
    }

    /// Blueprint owning a project, if any
    pub async fn get_by_project(&self, project_name: &str) -> Result<Option<Blueprint>> {
        if project_name.trim().is_empty() {
            return Err(BlueprintError::Internal(
                "project name is required".to_string(),
            ));
        }
        Ok(self.store.find_blueprint_by_project(project_name).await?)
    }

    /// Apply a partial update
    pub async fn patch(&self, id: Uuid, patch: PatchBlueprint) -> Result<Blueprint> {
        let mut blueprint = self.get(id).await?;

        if patch.plan.is_some() && blueprint.mode == BlueprintMode::Normal {
            return Err(BlueprintError::bad_input(
                "plan can only be set on ADVANCED blueprints",
            ));
        }

        patch.apply_to(&mut blueprint, chrono::Utc::now());
        self.validate_and_plan(&mut blueprint).await?;

        self.save(&blueprint).await?;
        tracing::info!("Blueprint updated: {} ({})", blueprint.name, blueprint.id);

        self.reload().await?;
        Ok(blueprint)
    }

    /// Delete a blueprint
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let deleted = self.store.delete_blueprint(id).await?;
        if !deleted {
            return Err(BlueprintError::NotFound(format!("blueprint {} not found", id)));
        }
        tracing::info!("Blueprint deleted: {}", id);

        self.reload().await
    }

    /// Run a blueprint now
    ///
    /// `skip_collectors` and `full_sync` of `sync_policy` override the
    /// blueprint's own policy for this run.
    pub async fn trigger(&self, id: Uuid, sync_policy: &SyncPolicy) -> Result<Pipeline> {
        let mut blueprint = self.get(id).await?;
        blueprint.sync_policy.skip_collectors = sync_policy.skip_collectors;
        blueprint.sync_policy.full_sync = sync_policy.full_sync;

        self.trigger.trigger(&blueprint, &blueprint.sync_policy).await
    }

    /// Rebuild the cron schedule from the store
    pub async fn reload(&self) -> Result<()> {
        self.scheduler
            .reconcile()
            .await
            .map(|_| ())
            .map_err(|e| BlueprintError::Reload(Box::new(e)))
    }

    /// Current cron entries
    pub async fn schedule(&self) -> Vec<ScheduledBlueprint> {
        self.scheduler.entries().await
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_structure(blueprint: &Blueprint) -> Result<()> {
    if blueprint.name.trim().is_empty() {
        return Err(BlueprintError::bad_input("Blueprint name cannot be empty"));
    }

    if blueprint.name.chars().count() > MAX_NAME_LEN {
        return Err(BlueprintError::bad_input(format!(
            "Blueprint name is too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }

    if !blueprint.is_manual && blueprint.cron_config.trim().is_empty() {
        return Err(BlueprintError::bad_input("cronConfig cannot be empty"));
    }

    if blueprint.labels.iter().any(|l| l.trim().is_empty()) {
        return Err(BlueprintError::bad_input("Labels cannot be empty"));
    }

    if blueprint
        .connections
        .iter()
        .any(|c| c.plugin_name.trim().is_empty())
    {
        return Err(BlueprintError::bad_input(
            "Connection plugin name cannot be empty",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Utc;
    use tributary_core::domain::blueprint::BlueprintConnection;
    use tributary_core::domain::plan::PipelinePlan;

    fn blueprint() -> Blueprint {
        let now = Utc::now();
        Blueprint {
            id: Uuid::new_v4(),
            name: "nightly".to_string(),
            mode: BlueprintMode::Normal,
            project_name: String::new(),
            cron_config: "0 0 * * *".to_string(),
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
        }
    }

    #[test]
    fn test_validate_empty_name() {
        let mut bp = blueprint();
        bp.name = "   ".to_string();
        let err = validate_structure(&bp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }

    #[test]
    fn test_validate_name_too_long() {
        let mut bp = blueprint();
        bp.name = "a".repeat(256);
        assert!(validate_structure(&bp).is_err());

        bp.name = "a".repeat(255);
        assert!(validate_structure(&bp).is_ok());
    }

    #[test]
    fn test_validate_name_length_counts_characters() {
        let mut bp = blueprint();
        bp.name = "é".repeat(255);
        assert_eq!(bp.name.len(), 510);
        assert!(validate_structure(&bp).is_ok());

        bp.name = "é".repeat(256);
        assert!(validate_structure(&bp).is_err());
    }

    #[test]
    fn test_validate_blank_cron_only_when_scheduled() {
        let mut bp = blueprint();
        bp.cron_config = String::new();
        assert!(validate_structure(&bp).is_err());

        bp.is_manual = true;
        assert!(validate_structure(&bp).is_ok());
    }

    #[test]
    fn test_validate_blank_label_and_plugin() {
        let mut bp = blueprint();
        bp.labels = vec!["ok".to_string(), " ".to_string()];
        assert!(validate_structure(&bp).is_err());

        let mut bp = blueprint();
        bp.connections = vec![BlueprintConnection {
            plugin_name: String::new(),
            connection_id: 1,
            scopes: vec![],
        }];
        assert!(validate_structure(&bp).is_err());
    }
}
