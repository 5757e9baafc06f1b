// Scheduling decisions: which guilds get a rotation job, and when it fires
//
// `schedule_guild` is invoked at startup for every enabled guild and again
// on every settings change; each call fully supersedes the guild's previous
// schedule. One guild's failure never touches another guild's job.

use crate::errors::{SchedulerError, StoreError};
use crate::gateway::MembershipGateway;
use crate::models::{GuildId, GuildRotationConfig, RoleId, RotationOutcome};
use crate::registry::GuildJobRegistry;
use crate::rotation::RotationExecutor;
use crate::schedule::RotationSchedule;
use crate::stores::GuildConfigStore;
use crate::telemetry;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Result of a scheduling pass for one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ScheduleDecision {
    /// A job is installed; the next fire instant is reported back.
    Installed { next_fire: DateTime<Utc> },
    /// The guild is ineligible; any previous job was cancelled.
    Cancelled,
}

/// Owns the policy that turns persisted settings into registry state.
pub struct RotationScheduler {
    configs: Arc<dyn GuildConfigStore>,
    gateway: Arc<dyn MembershipGateway>,
    registry: Arc<GuildJobRegistry>,
    executor: Arc<RotationExecutor>,
    default_timezone: Tz,
}

impl RotationScheduler {
    pub fn new(
        configs: Arc<dyn GuildConfigStore>,
        gateway: Arc<dyn MembershipGateway>,
        registry: Arc<GuildJobRegistry>,
        executor: Arc<RotationExecutor>,
        default_timezone: Tz,
    ) -> Self {
        Self {
            configs,
            gateway,
            registry,
            executor,
            default_timezone,
        }
    }

    pub fn registry(&self) -> &GuildJobRegistry {
        &self.registry
    }

    /// Re-evaluate one guild's schedule from persisted settings.
    ///
    /// Lookup errors (config store or gateway unavailable) leave any
    /// previously installed job untouched.
    #[instrument(skip(self))]
    pub async fn schedule_guild(
        &self,
        guild_id: GuildId,
    ) -> Result<ScheduleDecision, SchedulerError> {
        let config = self.configs.rotation_config(guild_id).await.map_err(|e| {
            error!(error = %e, "Config unavailable; existing job left untouched");
            e
        })?;

        let Some((role_id, expression)) = Self::eligibility(&config) else {
            self.registry.cancel(guild_id);
            telemetry::set_active_jobs(self.registry.len());
            return Ok(ScheduleDecision::Cancelled);
        };

        // The configured role must still exist in the guild.
        let role_ok = self
            .gateway
            .role_exists(guild_id, role_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Role lookup failed; existing job left untouched");
                e
            })?;
        if !role_ok {
            warn!(%role_id, "Configured title role no longer exists; job not installed");
            self.registry.cancel(guild_id);
            telemetry::set_active_jobs(self.registry.len());
            return Ok(ScheduleDecision::Cancelled);
        }

        let timezone = config.timezone.unwrap_or(self.default_timezone);
        let schedule = match RotationSchedule::parse(&expression, timezone) {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!(error = %e, "Invalid schedule expression; job not installed");
                self.registry.cancel(guild_id);
                telemetry::set_active_jobs(self.registry.len());
                return Ok(ScheduleDecision::Cancelled);
            }
        };
        let next_fire = match schedule.upcoming() {
            Ok(next_fire) => next_fire,
            Err(e) => {
                warn!(error = %e, "Schedule has no upcoming fire; job not installed");
                self.registry.cancel(guild_id);
                telemetry::set_active_jobs(self.registry.len());
                return Ok(ScheduleDecision::Cancelled);
            }
        };

        let executor = Arc::clone(&self.executor);
        self.registry.install(guild_id, schedule, move || {
            let executor = Arc::clone(&executor);
            async move {
                executor.run(guild_id, role_id).await;
            }
        });
        telemetry::set_active_jobs(self.registry.len());

        info!(%role_id, %next_fire, expression = %expression, "Rotation scheduled");
        Ok(ScheduleDecision::Installed { next_fire })
    }

    /// Install jobs for every guild with rotation enabled. Per-guild
    /// failures are logged and skipped. Returns the number of jobs
    /// installed.
    #[instrument(skip(self))]
    pub async fn resync_all(&self) -> Result<usize, StoreError> {
        let guild_ids = self.configs.enabled_guild_ids().await?;
        let mut installed = 0;

        for guild_id in guild_ids {
            match self.schedule_guild(guild_id).await {
                Ok(ScheduleDecision::Installed { .. }) => installed += 1,
                Ok(ScheduleDecision::Cancelled) => {}
                Err(e) => {
                    error!(%guild_id, error = %e, "Scheduling failed during resync");
                }
            }
        }

        info!(installed, "Startup resync complete");
        Ok(installed)
    }

    /// Run one rotation cycle immediately, outside the schedule. Used by
    /// the admin surface; requires rotation to be enabled with a role
    /// configured.
    #[instrument(skip(self))]
    pub async fn run_now(&self, guild_id: GuildId) -> Result<RotationOutcome, SchedulerError> {
        let config = self.configs.rotation_config(guild_id).await?;
        let Some(role_id) = config.title_role_id.filter(|_| config.enabled) else {
            return Err(SchedulerError::NotConfigured(guild_id));
        };
        Ok(self.executor.run(guild_id, role_id).await)
    }

    /// A guild is eligible only when rotation is enabled and both the title
    /// role and a schedule expression are configured.
    fn eligibility(config: &GuildRotationConfig) -> Option<(RoleId, String)> {
        if !config.enabled {
            return None;
        }
        let role_id = config.title_role_id?;
        let expression = config.schedule_expression.clone()?;
        Some((role_id, expression))
    }
}
