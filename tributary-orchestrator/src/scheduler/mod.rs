//! Scheduler Module
//!
//! Cron parsing, the cron engine and the reconciler that projects stored
//! blueprints onto it.

pub mod cron;
pub mod reconciler;

pub use cron::{CronEngine, CronEntry, CronJob, EntryId, TokioCron};
pub use reconciler::{BlueprintScheduler, ScheduledBlueprint};
