// Rotation executor: one end-to-end title rotation cycle for one guild
//
// Ordering contract: points are cleared only after the grant succeeded, and
// the strip fan-out is fully awaited before the abort decision is taken.

use crate::errors::GatewayError;
use crate::gateway::MembershipGateway;
use crate::models::{
    ChannelId, CycleStatus, GuildId, RoleId, RotationFailure, RotationOutcome, RotationPhase,
    UserId,
};
use crate::stores::{GuildConfigStore, LeaderboardStore};
use crate::telemetry;
use crate::template::TemplateRenderer;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Executes rotation cycles against the stores and the gateway.
///
/// Failures inside a cycle are captured into the outcome, never propagated:
/// a cycle can degrade but it cannot take the scheduler down with it.
pub struct RotationExecutor {
    configs: Arc<dyn GuildConfigStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    gateway: Arc<dyn MembershipGateway>,
    templates: TemplateRenderer,
}

impl RotationExecutor {
    pub fn new(
        configs: Arc<dyn GuildConfigStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        gateway: Arc<dyn MembershipGateway>,
    ) -> Self {
        Self {
            configs,
            leaderboard,
            gateway,
            templates: TemplateRenderer::new(),
        }
    }

    /// Run one rotation cycle and report the structured outcome.
    #[instrument(skip(self), fields(%guild_id, %role_id))]
    pub async fn run(&self, guild_id: GuildId, role_id: RoleId) -> RotationOutcome {
        let started = Instant::now();
        let outcome = self.run_cycle(guild_id, role_id).await;

        telemetry::record_cycle(&outcome, started.elapsed().as_secs_f64());
        info!(
            status = outcome.status.as_str(),
            winner_id = outcome.winner_id.map(|u| u.0),
            stripped = outcome.stripped.len(),
            failure_count = outcome.failure_count(),
            "Rotation cycle finished"
        );

        outcome
    }

    async fn run_cycle(&self, guild_id: GuildId, role_id: RoleId) -> RotationOutcome {
        // Notification context is optional; its absence (or a config store
        // hiccup at fire time) only silences messages, never aborts.
        let (channel, template) = match self.configs.rotation_config(guild_id).await {
            Ok(config) => (config.notify_channel_id, config.grant_message),
            Err(e) => {
                warn!(error = %e, "Config unavailable at fire time; notifications disabled this cycle");
                (None, None)
            }
        };

        // The top-ranked entry decides the candidate winner.
        let entries = match self.leaderboard.top_entries(guild_id, 1).await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Leaderboard unavailable; aborting cycle without mutations");
                return self.no_winner(guild_id);
            }
        };
        let Some(top) = entries.first() else {
            debug!("Leaderboard is empty; nothing to rotate");
            return self.no_winner(guild_id);
        };
        let winner = top.user_id;

        // A winner who left the guild forfeits the cycle; points carry over.
        match self.gateway.is_member(guild_id, winner).await {
            Ok(true) => {}
            Ok(false) => {
                info!(%winner, score = top.score, "Top-ranked user is no longer a member; points preserved");
                return self.no_winner(guild_id);
            }
            Err(e) => {
                error!(error = %e, %winner, "Member lookup failed; aborting cycle without mutations");
                return self.no_winner(guild_id);
            }
        }

        // Strip phase: remove the title from every current holder, all
        // attempts in flight at once, decision only after the barrier.
        let holders = match self.gateway.role_holders(guild_id, role_id).await {
            Ok(holders) => holders,
            Err(e) => {
                error!(error = %e, "Could not enumerate title holders");
                self.notify_role_trouble(channel, role_id, RotationPhase::Strip, &e)
                    .await;
                return RotationOutcome {
                    guild_id,
                    status: CycleStatus::StripFailed,
                    winner_id: Some(winner),
                    stripped: Vec::new(),
                    failures: Vec::new(),
                };
            }
        };

        let attempts = join_all(holders.iter().map(|&holder| {
            let gateway = Arc::clone(&self.gateway);
            async move { (holder, gateway.remove_role(guild_id, holder, role_id).await) }
        }))
        .await;

        let mut stripped = Vec::new();
        let mut failures = Vec::new();
        let mut first_strip_error: Option<GatewayError> = None;
        for (holder, result) in attempts {
            match result {
                Ok(()) => stripped.push(holder),
                Err(cause) => {
                    failures.push(RotationFailure {
                        user_id: holder,
                        phase: RotationPhase::Strip,
                        cause: cause.to_string(),
                    });
                    first_strip_error.get_or_insert(cause);
                }
            }
        }

        if let Some(cause) = first_strip_error {
            warn!(
                failed = failures.len(),
                attempted = holders.len(),
                "Strip phase failed for some holders; aborting before grant"
            );
            // One diagnostic notice per cycle, regardless of how many
            // holders failed.
            self.notify_role_trouble(channel, role_id, RotationPhase::Strip, &cause)
                .await;
            return RotationOutcome {
                guild_id,
                status: CycleStatus::StripFailed,
                winner_id: Some(winner),
                stripped,
                failures,
            };
        }

        // Grant phase: a single sequential mutation.
        if let Err(cause) = self.gateway.add_role(guild_id, winner, role_id).await {
            error!(error = %cause, %winner, "Grant failed; points preserved");
            self.notify_role_trouble(channel, role_id, RotationPhase::Grant, &cause)
                .await;
            failures.push(RotationFailure {
                user_id: winner,
                phase: RotationPhase::Grant,
                cause: cause.to_string(),
            });
            return RotationOutcome {
                guild_id,
                status: CycleStatus::GrantFailed,
                winner_id: Some(winner),
                stripped,
                failures,
            };
        }

        // The winner holds the title; only now may the ledger be reset.
        if let Err(e) = self.leaderboard.clear_points(guild_id).await {
            error!(error = %e, "Failed to clear points after grant; next cycle clears again");
        }

        self.announce(channel, template.as_deref(), winner, role_id)
            .await;
        info!(%winner, "Title rotated");

        RotationOutcome {
            guild_id,
            status: CycleStatus::Completed,
            winner_id: Some(winner),
            stripped,
            failures,
        }
    }

    fn no_winner(&self, guild_id: GuildId) -> RotationOutcome {
        RotationOutcome {
            guild_id,
            status: CycleStatus::NoWinner,
            winner_id: None,
            stripped: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Best-effort operator notice for a failed role mutation. Sent at most
    /// once per cycle; delivery failures are swallowed.
    async fn notify_role_trouble(
        &self,
        channel: Option<ChannelId>,
        role_id: RoleId,
        phase: RotationPhase,
        cause: &GatewayError,
    ) {
        let Some(channel) = channel else { return };

        let hint = if cause.is_permission() {
            "Check that my highest role sits above the title role and that I can manage roles."
        } else {
            "The title was left unchanged for this cycle."
        };
        let text = format!(
            "Title rotation could not update the {} role during the {phase} phase. {hint}",
            role_id.mention()
        );

        if let Err(e) = self.gateway.send_message(channel, &text).await {
            warn!(error = %e, "Diagnostic notice delivery failed");
        }
    }

    /// Render and send the configured grant announcement. Absence of a
    /// template or channel sends nothing; delivery failures are swallowed.
    async fn announce(
        &self,
        channel: Option<ChannelId>,
        template: Option<&str>,
        winner: UserId,
        role_id: RoleId,
    ) {
        let (Some(channel), Some(template)) = (channel, template) else {
            return;
        };

        let text = self
            .templates
            .render(template, &winner.mention(), &role_id.mention());
        if let Err(e) = self.gateway.send_message(channel, &text).await {
            warn!(error = %e, "Grant announcement delivery failed");
        }
    }
}
