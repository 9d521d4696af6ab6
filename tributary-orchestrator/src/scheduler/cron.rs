//! Cron engine
//!
//! Parses standard five-field expressions and runs jobs at their fire times
//! from a single tokio timer loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use croner::Cron;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::CronError;

pub type EntryId = u64;

/// Parses a five-field cron expression or an `@daily`-style descriptor
///
/// The expression is taken as written: surrounding whitespace is rejected
/// so the stored string is exactly the one that gets scheduled.
pub fn parse_standard(expr: &str) -> Result<Cron, CronError> {
    let invalid = |message: String| CronError::InvalidExpression {
        expr: expr.to_string(),
        message,
    };

    if expr.trim().is_empty() {
        return Err(invalid("empty expression".to_string()));
    }
    if expr.trim() != expr {
        return Err(invalid("leading or trailing whitespace".to_string()));
    }
    if !expr.starts_with('@') {
        let fields = expr.split_whitespace().count();
        if fields != 5 {
            return Err(invalid(format!("expected 5 fields, found {}", fields)));
        }
    }

    Cron::new(expr)
        .parse()
        .map_err(|e| invalid(e.to_string()))
}

/// First fire time strictly after `after`
pub fn next_fire(schedule: &Cron, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.find_next_occurrence(after, false).ok()
}

/// Work run when an entry fires
#[async_trait]
pub trait CronJob: Send + Sync {
    async fn run(&self);
}

/// Snapshot of a registered entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronEntry {
    pub id: EntryId,
    pub expression: String,
    pub next_fire: Option<DateTime<Utc>>,
}

/// Timer-driven job table
///
/// Callers serialize mutations; implementations only guard what their own
/// timer needs.
pub trait CronEngine: Send + Sync {
    /// Registers `job` under `expr`, rejecting invalid expressions
    fn add_job(&mut self, expr: &str, job: Arc<dyn CronJob>) -> Result<EntryId, CronError>;

    fn remove(&mut self, id: EntryId);

    fn entries(&self) -> Vec<CronEntry>;

    fn start(&mut self);

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

// =============================================================================
// Tokio implementation
// =============================================================================

struct Entry {
    id: EntryId,
    expression: String,
    schedule: Cron,
    job: Arc<dyn CronJob>,
    next_fire: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Shared {
    entries: Mutex<Vec<Entry>>,
    wake: Notify,
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        // Entries stay consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn earliest_fire(&self) -> Option<DateTime<Utc>> {
        self.entries().iter().filter_map(|e| e.next_fire).min()
    }

    /// Spawns every job due at `now` and moves its entry to the next fire time
    fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        for entry in self.entries().iter_mut() {
            if entry.next_fire.is_some_and(|at| at <= now) {
                let job = Arc::clone(&entry.job);
                tokio::spawn(async move { job.run().await });
                entry.next_fire = next_fire(&entry.schedule, &now);
                fired += 1;
            }
        }
        fired
    }

    fn reschedule_all(&self, now: DateTime<Utc>) {
        for entry in self.entries().iter_mut() {
            entry.next_fire = next_fire(&entry.schedule, &now);
        }
    }
}

/// Cron engine running on the tokio runtime
///
/// Jobs are spawned as independent tasks and never block the timer loop.
#[derive(Default)]
pub struct TokioCron {
    shared: Arc<Shared>,
    last_id: EntryId,
    timer: Option<JoinHandle<()>>,
}

impl TokioCron {
    pub fn new() -> Self {
        Self::default()
    }
}

async fn run_timer(shared: Arc<Shared>) {
    loop {
        match shared.earliest_fire() {
            None => shared.wake.notified().await,
            Some(at) => {
                let wait = (at - Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        let fired = shared.fire_due(Utc::now());
                        tracing::debug!("Cron tick fired {} job(s)", fired);
                    }
                    _ = shared.wake.notified() => {}
                }
            }
        }
    }
}

impl CronEngine for TokioCron {
    fn add_job(&mut self, expr: &str, job: Arc<dyn CronJob>) -> Result<EntryId, CronError> {
        let schedule = parse_standard(expr)?;
        let next = next_fire(&schedule, &Utc::now())
            .ok_or_else(|| CronError::NoUpcomingFire(expr.to_string()))?;

        self.last_id += 1;
        self.shared.entries().push(Entry {
            id: self.last_id,
            expression: expr.to_string(),
            schedule,
            job,
            next_fire: Some(next),
        });
        self.shared.wake.notify_one();

        Ok(self.last_id)
    }

    fn remove(&mut self, id: EntryId) {
        self.shared.entries().retain(|e| e.id != id);
        self.shared.wake.notify_one();
    }

    fn entries(&self) -> Vec<CronEntry> {
        self.shared
            .entries()
            .iter()
            .map(|e| CronEntry {
                id: e.id,
                expression: e.expression.clone(),
                next_fire: e.next_fire,
            })
            .collect()
    }

    fn start(&mut self) {
        if self.is_running() {
            return;
        }
        // Fire times missed while stopped are skipped
        self.shared.reschedule_all(Utc::now());
        self.timer = Some(tokio::spawn(run_timer(Arc::clone(&self.shared))));
        tracing::debug!("Cron engine started");
    }

    fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            tracing::debug!("Cron engine stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TokioCron {
    fn drop(&mut self) {
        self.stop();
    }
}
