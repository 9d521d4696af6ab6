//! Pipeline plan domain types
//!
//! A plan is an ordered list of stages. Tasks inside a stage may run
//! concurrently; stages run one after another.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Plugins that never justify a pipeline run on their own.
///
/// They only post-process data collected by other plugins, so a plan made
/// exclusively of these tasks is treated as having nothing to do.
pub const STRUCTURAL_PLUGINS: [&str; 3] = ["org", "refdiff", "dora"];

/// A single unit of work executed by a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTask {
    pub plugin: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub options: Map<String, JsonValue>,
}

impl PipelineTask {
    /// Creates a task without subtasks or options
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            subtasks: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn with_subtasks(mut self, subtasks: Vec<String>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Whether this task belongs to the structural plugin set
    pub fn is_structural(&self) -> bool {
        STRUCTURAL_PLUGINS.contains(&self.plugin.as_str())
    }
}

/// Tasks that may run concurrently
pub type PipelineStage = Vec<PipelineTask>;

/// Ordered sequence of stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelinePlan(pub Vec<PipelineStage>);

impl PipelinePlan {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.0
    }

    /// Number of stages, including stages without tasks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn task_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// Whether the plan has no stage at all.
    ///
    /// This is the structural check used to validate authored plans; use
    /// [`PipelinePlan::is_empty`] to decide whether a plan is worth running.
    pub fn has_no_stages(&self) -> bool {
        self.0.is_empty()
    }

    /// True when there is no task, or every task is structural.
    pub fn is_empty(&self) -> bool {
        self.0
            .iter()
            .flatten()
            .all(PipelineTask::is_structural)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &PipelineTask> {
        self.0.iter().flatten()
    }
}

impl From<Vec<PipelineStage>> for PipelinePlan {
    fn from(stages: Vec<PipelineStage>) -> Self {
        Self(stages)
    }
}

/// Merges plans that can run side by side.
///
/// Stage `i` of the result holds the tasks of stage `i` of every input, in
/// input order. Shorter plans simply contribute nothing to the later stages.
pub fn parallelize<I>(plans: I) -> PipelinePlan
where
    I: IntoIterator<Item = PipelinePlan>,
{
    let mut merged: Vec<PipelineStage> = Vec::new();
    for plan in plans {
        for (index, stage) in plan.0.into_iter().enumerate() {
            if index >= merged.len() {
                merged.push(Vec::new());
            }
            merged[index].extend(stage);
        }
    }
    PipelinePlan(merged)
}

/// Chains plans that must run one after another.
pub fn sequentialize<I>(plans: I) -> PipelinePlan
where
    I: IntoIterator<Item = PipelinePlan>,
{
    PipelinePlan(plans.into_iter().flat_map(|plan| plan.0).collect())
}
