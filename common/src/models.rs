// Domain models for guild title rotation

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

// Platform identifiers are 64-bit snowflakes; Postgres stores them as BIGINT.
macro_rules! snowflake_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

snowflake_id!(
    /// A community (tenant) identifier.
    GuildId
);
snowflake_id!(
    /// A member identifier, unique platform-wide.
    UserId
);
snowflake_id!(
    /// A role identifier, scoped to a guild.
    RoleId
);
snowflake_id!(
    /// A text channel identifier.
    ChannelId
);

impl UserId {
    /// Chat-platform mention syntax for a member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    /// Chat-platform mention syntax for a role.
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.0)
    }
}

// ============================================================================
// Rotation configuration
// ============================================================================

/// Per-guild rotation settings as persisted in `guild_rotation_settings`.
///
/// Read fresh on every scheduling decision; never cached across fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRotationConfig {
    pub guild_id: GuildId,
    pub enabled: bool,
    pub title_role_id: Option<RoleId>,
    pub schedule_expression: Option<String>,
    /// Timezone the cron expression is evaluated in. Falls back to the
    /// service-wide default when unset.
    pub timezone: Option<Tz>,
    pub notify_channel_id: Option<ChannelId>,
    /// Grant announcement template; supports `{member}` and `{role}`.
    pub grant_message: Option<String>,
}

impl GuildRotationConfig {
    /// The implicit configuration of a guild with no settings row.
    pub fn disabled(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            enabled: false,
            title_role_id: None,
            schedule_expression: None,
            timezone: None,
            notify_channel_id: None,
            grant_message: None,
        }
    }
}

// ============================================================================
// Leaderboard
// ============================================================================

/// One ranked leaderboard row. Ordering (score descending, store-side
/// tie-break) is the store's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub score: i64,
}

// ============================================================================
// Cycle outcome
// ============================================================================

/// The two mutating stages of a rotation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    Strip,
    Grant,
}

impl fmt::Display for RotationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationPhase::Strip => write!(f, "strip"),
            RotationPhase::Grant => write!(f, "grant"),
        }
    }
}

/// A single failed role mutation, recorded without aborting the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationFailure {
    pub user_id: UserId,
    pub phase: RotationPhase,
    pub cause: String,
}

/// Terminal state of one rotation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Winner crowned, points cleared.
    Completed,
    /// Empty leaderboard, or the top-ranked user left the guild. Nothing
    /// was mutated; points are preserved for the next cycle.
    NoWinner,
    /// At least one strip failed; the cycle stopped before the grant.
    StripFailed,
    /// The grant itself failed; points were not cleared.
    GrantFailed,
}

impl CycleStatus {
    /// Stable label used in metrics and operator log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Completed => "completed",
            CycleStatus::NoWinner => "no_winner",
            CycleStatus::StripFailed => "strip_failed",
            CycleStatus::GrantFailed => "grant_failed",
        }
    }
}

/// Structured report of one cycle, produced exactly once per execution.
/// Consumed for logging and notification only, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationOutcome {
    pub guild_id: GuildId,
    pub status: CycleStatus,
    pub winner_id: Option<UserId>,
    /// Members the title was successfully removed from this cycle.
    pub stripped: Vec<UserId>,
    pub failures: Vec<RotationFailure>,
}

impl RotationOutcome {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_display_and_mention() {
        let user = UserId(42);
        assert_eq!(user.to_string(), "42");
        assert_eq!(user.mention(), "<@42>");
        assert_eq!(RoleId(7).mention(), "<@&7>");
    }

    #[test]
    fn test_snowflake_serializes_as_bare_number() {
        let json = serde_json::to_string(&GuildId(123)).unwrap();
        assert_eq!(json, "123");
        let back: GuildId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GuildId(123));
    }

    #[test]
    fn test_disabled_config_is_ineligible_shaped() {
        let config = GuildRotationConfig::disabled(GuildId(1));
        assert!(!config.enabled);
        assert!(config.title_role_id.is_none());
        assert!(config.schedule_expression.is_none());
    }

    #[test]
    fn test_cycle_status_serialization() {
        let json = serde_json::to_string(&CycleStatus::NoWinner).unwrap();
        assert_eq!(json, "\"no_winner\"");
    }
}
