//! Blueprint scheduler
//!
//! Keeps the cron engine in line with the stored blueprints. Every
//! reconciliation rebuilds the schedule from scratch under one lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tributary_core::domain::blueprint::Blueprint;
use tributary_core::dto::blueprint::BlueprintQuery;
use uuid::Uuid;

use super::cron::{CronEngine, CronJob, EntryId};
use crate::error::{BlueprintError, Result};
use crate::repository::BlueprintStore;
use crate::service::trigger::PipelineTrigger;

/// A cron entry and the blueprint it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledBlueprint {
    pub entry_id: EntryId,
    pub blueprint_id: Uuid,
    pub cron_config: String,
    pub next_fire: Option<DateTime<Utc>>,
}

struct Schedule {
    engine: Box<dyn CronEngine>,
    blueprints: HashMap<EntryId, Uuid>,
}

pub struct BlueprintScheduler {
    store: Arc<dyn BlueprintStore>,
    trigger: PipelineTrigger,
    schedule: Mutex<Schedule>,
}

impl BlueprintScheduler {
    pub fn new(
        store: Arc<dyn BlueprintStore>,
        trigger: PipelineTrigger,
        engine: Box<dyn CronEngine>,
    ) -> Self {
        Self {
            store,
            trigger,
            schedule: Mutex::new(Schedule {
                engine,
                blueprints: HashMap::new(),
            }),
        }
    }

    /// Rebuilds the cron schedule from every enabled, non-manual blueprint
    ///
    /// Concurrent callers queue on the schedule lock. A rejected cron
    /// expression aborts the rebuild and leaves the engine stopped.
    pub async fn reconcile(&self) -> Result<usize> {
        let mut schedule = self.schedule.lock().await;

        let (blueprints, _) = self
            .store
            .find_blueprints(&BlueprintQuery::schedulable())
            .await?;

        let Schedule { engine, blueprints: jobs } = &mut *schedule;
        for entry_id in jobs.keys() {
            engine.remove(*entry_id);
        }
        jobs.clear();
        engine.stop();

        for blueprint in blueprints {
            let blueprint_id = blueprint.id;
            let expr = blueprint.cron_config.clone();
            let job = Arc::new(BlueprintJob {
                blueprint,
                trigger: self.trigger.clone(),
            });

            match engine.add_job(&expr, job) {
                Ok(entry_id) => {
                    jobs.insert(entry_id, blueprint_id);
                }
                Err(source) => {
                    // Nothing of a partial rebuild may stay visible
                    for entry_id in jobs.keys() {
                        engine.remove(*entry_id);
                    }
                    jobs.clear();
                    return Err(BlueprintError::Schedule {
                        blueprint_id,
                        source,
                    });
                }
            }
        }

        if !jobs.is_empty() {
            engine.start();
        }

        tracing::info!("Scheduled {} blueprint(s)", jobs.len());
        Ok(jobs.len())
    }

    /// Current entries, soonest first
    pub async fn entries(&self) -> Vec<ScheduledBlueprint> {
        let schedule = self.schedule.lock().await;

        let mut entries: Vec<ScheduledBlueprint> = schedule
            .engine
            .entries()
            .into_iter()
            .filter_map(|entry| {
                let blueprint_id = *schedule.blueprints.get(&entry.id)?;
                Some(ScheduledBlueprint {
                    entry_id: entry.id,
                    blueprint_id,
                    cron_config: entry.expression,
                    next_fire: entry.next_fire,
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.next_fire.is_none(), e.next_fire, e.entry_id));
        entries
    }

    pub async fn is_running(&self) -> bool {
        self.schedule.lock().await.engine.is_running()
    }

    /// Stops firing jobs; entries are kept
    pub async fn shutdown(&self) {
        self.schedule.lock().await.engine.stop();
        tracing::info!("Blueprint scheduler stopped");
    }
}

/// Scheduled run of one blueprint with its own sync policy
struct BlueprintJob {
    blueprint: Blueprint,
    trigger: PipelineTrigger,
}

#[async_trait]
impl CronJob for BlueprintJob {
    async fn run(&self) {
        let blueprint = &self.blueprint;
        match self.trigger.trigger(blueprint, &blueprint.sync_policy).await {
            Ok(pipeline) => tracing::info!(
                "Run new cron job successfully for blueprint {} ({}), pipeline id: {}",
                blueprint.name,
                blueprint.id,
                pipeline.id
            ),
            Err(e) if e.is_empty_plan() => tracing::info!(
                "Empty plan, blueprint id: {}, blueprint name: {}",
                blueprint.id,
                blueprint.name
            ),
            Err(e) => tracing::error!(
                "Run cron job failed for blueprint {} ({}): {}",
                blueprint.name,
                blueprint.id,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plan::{PlanComposer, StandardPlanGenerator};
    use crate::repository::MemoryStore;
    use crate::scheduler::cron::TokioCron;
    use tributary_core::domain::blueprint::{BlueprintMode, SyncPolicy};
    use tributary_core::domain::plan::PipelinePlan;

    fn blueprint(cron: &str, enable: bool, is_manual: bool) -> Blueprint {
        let now = Utc::now();
        Blueprint {
            id: Uuid::new_v4(),
            name: format!("bp {}", cron),
            mode: BlueprintMode::Advanced,
            project_name: String::new(),
            cron_config: cron.to_string(),
            is_manual,
            enable,
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

    fn scheduler(store: Arc<MemoryStore>) -> BlueprintScheduler {
        let composer = PlanComposer::new(store.clone(), Arc::new(StandardPlanGenerator::builtin()));
        let trigger = PipelineTrigger::new(composer, store.clone());
        BlueprintScheduler::new(store, trigger, Box::new(TokioCron::new()))
    }

    #[tokio::test]
    async fn test_only_enabled_cron_blueprints_are_scheduled() {
        let store = Arc::new(MemoryStore::new());
        let scheduled = blueprint("0 0 * * *", true, false);
        for bp in [
            scheduled.clone(),
            blueprint("0 0 * * 1", false, false),
            blueprint("manual", true, true),
        ] {
            store.save_blueprint(&bp).await.unwrap();
        }
        let scheduler = scheduler(store);

        assert_eq!(scheduler.reconcile().await.unwrap(), 1);

        let entries = scheduler.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].blueprint_id, scheduled.id);
        assert_eq!(entries[0].cron_config, "0 0 * * *");
        assert!(scheduler.is_running().await);
    }

    #[tokio::test]
    async fn test_reconcile_replaces_previous_entries() {
        let store = Arc::new(MemoryStore::new());
        let mut bp = blueprint("0 0 * * *", true, false);
        store.save_blueprint(&bp).await.unwrap();
        let scheduler = scheduler(store.clone());

        scheduler.reconcile().await.unwrap();
        scheduler.reconcile().await.unwrap();
        assert_eq!(scheduler.entries().await.len(), 1);

        bp.enable = false;
        store.save_blueprint(&bp).await.unwrap();
        assert_eq!(scheduler.reconcile().await.unwrap(), 0);
        assert!(scheduler.entries().await.is_empty());
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn test_rejected_cron_aborts_with_engine_stopped() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_blueprint(&blueprint("0 0 * * *", true, false))
            .await
            .unwrap();
        let scheduler = scheduler(store.clone());
        scheduler.reconcile().await.unwrap();
        assert!(scheduler.is_running().await);

        let broken = blueprint("every day", true, false);
        store.save_blueprint(&broken).await.unwrap();

        let err = scheduler.reconcile().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(matches!(
            err,
            BlueprintError::Schedule { blueprint_id, .. } if blueprint_id == broken.id
        ));
        assert!(!scheduler.is_running().await);
        assert!(scheduler.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_reconcile_leaves_no_partial_entries() {
        let store = Arc::new(MemoryStore::new());
        for cron in ["0 0 * * *", "0 0 * * 1", "*/5 * * * *"] {
            store
                .save_blueprint(&blueprint(cron, true, false))
                .await
                .unwrap();
        }
        // Oldest blueprints are scheduled last, after the valid ones
        let mut broken = blueprint("at noon", true, false);
        broken.created_at = Utc::now() - chrono::Duration::hours(1);
        store.save_blueprint(&broken).await.unwrap();
        let scheduler = scheduler(store);

        assert!(scheduler.reconcile().await.is_err());

        let schedule = scheduler.schedule.lock().await;
        assert!(schedule.blueprints.is_empty());
        assert!(schedule.engine.entries().is_empty());
        assert!(!schedule.engine.is_running());
    }

    #[tokio::test]
    async fn test_shutdown_stops_engine() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_blueprint(&blueprint("0 0 * * *", true, false))
            .await
            .unwrap();
        let scheduler = scheduler(store);
        scheduler.reconcile().await.unwrap();

        scheduler.shutdown().await;
        assert!(!scheduler.is_running().await);
        assert_eq!(scheduler.entries().await.len(), 1);
    }
}
