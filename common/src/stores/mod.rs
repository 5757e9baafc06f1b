// Persistence seams consumed by the scheduler and the rotation executor

mod postgres;

pub use postgres::{PgGuildConfigStore, PgLeaderboardStore};

use crate::errors::StoreError;
use crate::models::{GuildId, GuildRotationConfig, LeaderboardEntry};
use async_trait::async_trait;

/// Read access to per-guild rotation settings.
///
/// Configuration is re-fetched on every scheduling decision and at every
/// fire; implementations must be cheap to call and must not cache staleness
/// past a config change.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    /// Settings for one guild. A guild without a settings row is reported
    /// as a disabled configuration, not an error.
    async fn rotation_config(&self, guild_id: GuildId) -> Result<GuildRotationConfig, StoreError>;

    /// All guilds whose rotation flag is currently on, for the startup
    /// resync pass.
    async fn enabled_guild_ids(&self) -> Result<Vec<GuildId>, StoreError>;
}

/// Read/clear access to the per-guild points leaderboard.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Ranked entries, highest score first. Ties break in a stable
    /// store-side order that callers must not rely on.
    async fn top_entries(
        &self,
        guild_id: GuildId,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, StoreError>;

    /// Remove every score for the guild. Invoked only after a successful
    /// grant.
    async fn clear_points(&self, guild_id: GuildId) -> Result<(), StoreError>;
}
