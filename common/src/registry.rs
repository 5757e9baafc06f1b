// Keyed timer table: at most one recurring rotation job per guild
//
// The registry is a generic timer arena; it knows nothing about rotation
// semantics. Cancelling or replacing a handle stops future fires. Each fire
// runs as a detached task, so a cycle already in progress is never
// interrupted by cancellation.

use crate::models::GuildId;
use crate::schedule::RotationSchedule;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct JobHandle {
    task: JoinHandle<()>,
    expression: String,
}

/// Process-wide table of guild id → active recurring job.
#[derive(Default)]
pub struct GuildJobRegistry {
    jobs: Mutex<HashMap<GuildId, JobHandle>>,
}

impl GuildJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a recurring job for the guild, replacing (and stopping) any
    /// existing one. The callback is invoked once per schedule fire.
    pub fn install<F, Fut>(&self, guild_id: GuildId, schedule: RotationSchedule, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let expression = schedule.expression().to_string();

        // Stop any previous timer before its replacement starts, so two
        // timers for one guild never run side by side.
        let previous = self.jobs.lock().unwrap().remove(&guild_id);
        let replaced = previous.is_some();
        if let Some(previous) = previous {
            previous.task.abort();
        }

        let task = tokio::spawn(async move {
            loop {
                let Some(next) = schedule.next_fire(Utc::now()) else {
                    warn!(%guild_id, "Schedule exhausted, stopping timer");
                    break;
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                debug!(%guild_id, next_fire = %next, "Waiting for next fire");
                tokio::time::sleep(delay).await;

                // Detached: aborting the timer never cancels a fire that
                // has already started.
                tokio::spawn(job());
            }
        });

        // A concurrent install may have slipped in; whatever this insert
        // displaces is stopped as well.
        if let Some(displaced) = self
            .jobs
            .lock()
            .unwrap()
            .insert(guild_id, JobHandle { task, expression })
        {
            displaced.task.abort();
        }

        if replaced {
            info!(%guild_id, "Replaced existing rotation job");
        } else {
            info!(%guild_id, "Rotation job installed");
        }
    }

    /// Stop the guild's job. No-op when the guild has none.
    pub fn cancel(&self, guild_id: GuildId) {
        if let Some(handle) = self.jobs.lock().unwrap().remove(&guild_id) {
            handle.task.abort();
            info!(%guild_id, "Rotation job cancelled");
        }
    }

    pub fn has(&self, guild_id: GuildId) -> bool {
        self.jobs.lock().unwrap().contains_key(&guild_id)
    }

    /// Schedule expression of the guild's active job, if any.
    pub fn expression(&self, guild_id: GuildId) -> Option<String> {
        self.jobs
            .lock()
            .unwrap()
            .get(&guild_id)
            .map(|handle| handle.expression.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().unwrap().is_empty()
    }

    /// Stop every job. In-flight cycles still run to completion.
    pub fn shutdown(&self) {
        // Runs from Drop as well; a poisoned map is left to the runtime.
        let Ok(mut jobs) = self.jobs.lock() else {
            return;
        };
        let count = jobs.len();
        for (_, handle) in jobs.drain() {
            handle.task.abort();
        }
        info!(count, "All rotation jobs stopped");
    }
}

impl Drop for GuildJobRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
