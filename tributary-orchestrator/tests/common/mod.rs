//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tributary_core::domain::blueprint::{BlueprintConnection, BlueprintMode, BlueprintScope};
use tributary_core::domain::plan::{PipelinePlan, PipelineTask};
use tributary_core::dto::blueprint::CreateBlueprint;
use tributary_orchestrator::error::{CronError, PlanError};
use tributary_orchestrator::plan::PlanGenerator;
use tributary_orchestrator::repository::MemoryStore;
use tributary_orchestrator::scheduler::cron::{
    CronEngine, CronEntry, CronJob, EntryId, parse_standard,
};
use tributary_orchestrator::service::BlueprintService;

// =============================================================================
// Cron engine
// =============================================================================

#[derive(Default)]
struct CronState {
    last_id: EntryId,
    entries: Vec<(EntryId, String, Arc<dyn CronJob>)>,
    running: bool,
    starts: usize,
}

/// Cron engine that records entries and only fires on demand
#[derive(Clone, Default)]
pub struct RecordingCron {
    state: Arc<Mutex<CronState>>,
}

impl RecordingCron {
    pub fn expressions(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.entries.iter().map(|(_, expr, _)| expr.clone()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    /// Runs every registered job once, as if they were all due
    pub async fn fire_all(&self) {
        let jobs: Vec<Arc<dyn CronJob>> = {
            let state = self.state.lock().unwrap();
            state.entries.iter().map(|(_, _, job)| job.clone()).collect()
        };
        for job in jobs {
            job.run().await;
        }
    }
}

impl CronEngine for RecordingCron {
    fn add_job(&mut self, expr: &str, job: Arc<dyn CronJob>) -> Result<EntryId, CronError> {
        parse_standard(expr)?;
        let mut state = self.state.lock().unwrap();
        state.last_id += 1;
        let id = state.last_id;
        state.entries.push((id, expr.to_string(), job));
        Ok(id)
    }

    fn remove(&mut self, id: EntryId) {
        self.state
            .lock()
            .unwrap()
            .entries
            .retain(|(entry_id, _, _)| *entry_id != id);
    }

    fn entries(&self) -> Vec<CronEntry> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .map(|(id, expr, _)| CronEntry {
                id: *id,
                expression: expr.clone(),
                next_fire: None,
            })
            .collect()
    }

    fn start(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.running = true;
        state.starts += 1;
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().running = false;
    }

    fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }
}

// =============================================================================
// Plan generator
// =============================================================================

/// One task per connection; `collect` is dropped when collectors are skipped
///
/// Connections of the `unknown` plugin fail. Metric plugins add a second
/// stage with one task each.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub calls: Mutex<usize>,
}

impl ScriptedGenerator {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PlanGenerator for ScriptedGenerator {
    async fn generate_plan(
        &self,
        project_name: &str,
        connections: &[BlueprintConnection],
        metrics: &BTreeMap<String, JsonValue>,
        skip_collectors: bool,
    ) -> Result<PipelinePlan, PlanError> {
        *self.calls.lock().unwrap() += 1;

        let mut sources = Vec::new();
        for connection in connections {
            if connection.plugin_name == "unknown" {
                return Err(PlanError::UnknownPlugin(connection.plugin_name.clone()));
            }
            let mut subtasks = vec!["collect".to_string(), "extract".to_string()];
            if skip_collectors {
                subtasks.remove(0);
            }
            sources.push(
                PipelineTask::new(connection.plugin_name.clone())
                    .with_subtasks(subtasks)
                    .with_option("connectionId", connection.connection_id.into()),
            );
        }

        let mut stages = Vec::new();
        if !sources.is_empty() {
            stages.push(sources);
        }
        if !metrics.is_empty() {
            stages.push(
                metrics
                    .keys()
                    .map(|plugin| {
                        PipelineTask::new(plugin.clone())
                            .with_option("projectName", project_name.into())
                    })
                    .collect(),
            );
        }
        Ok(PipelinePlan(stages))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cron: RecordingCron,
    pub generator: Arc<ScriptedGenerator>,
    pub service: Arc<BlueprintService>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let cron = RecordingCron::default();
    let generator = Arc::new(ScriptedGenerator::default());
    let service = BlueprintService::new(
        store.clone(),
        generator.clone(),
        store.clone(),
        Box::new(cron.clone()),
    );
    Harness {
        store,
        cron,
        generator,
        service: Arc::new(service),
    }
}

pub fn connection(plugin: &str, id: u64) -> BlueprintConnection {
    BlueprintConnection {
        plugin_name: plugin.to_string(),
        connection_id: id,
        scopes: vec![BlueprintScope::new("1")],
    }
}

pub fn normal(name: &str, cron: &str) -> CreateBlueprint {
    CreateBlueprint {
        name: name.to_string(),
        mode: BlueprintMode::Normal,
        project_name: String::new(),
        cron_config: cron.to_string(),
        is_manual: false,
        enable: true,
        connections: vec![connection("github", 1)],
        labels: vec![],
        sync_policy: Default::default(),
        before_plan: PipelinePlan::new(),
        after_plan: PipelinePlan::new(),
        plan: PipelinePlan::new(),
    }
}

pub fn advanced(name: &str, cron: &str, plan: PipelinePlan) -> CreateBlueprint {
    CreateBlueprint {
        mode: BlueprintMode::Advanced,
        connections: vec![],
        plan,
        ..normal(name, cron)
    }
}

pub fn plan_of(stages: &[&[&str]]) -> PipelinePlan {
    PipelinePlan(
        stages
            .iter()
            .map(|stage| stage.iter().map(|p| PipelineTask::new(*p)).collect())
            .collect(),
    )
}
