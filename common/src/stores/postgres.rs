// Postgres adapters for the settings and leaderboard stores

use crate::db::DbPool;
use crate::errors::StoreError;
use crate::models::{ChannelId, GuildId, GuildRotationConfig, LeaderboardEntry, RoleId, UserId};
use crate::schedule::parse_timezone;
use async_trait::async_trait;
use sqlx::Row;
use tracing::instrument;

use super::{GuildConfigStore, LeaderboardStore};

/// Rotation settings backed by the `guild_rotation_settings` table.
pub struct PgGuildConfigStore {
    pool: DbPool,
}

impl PgGuildConfigStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a guild's rotation settings. Used by the admin
    /// surface; the scheduler only reads.
    #[instrument(skip(self, config), fields(guild_id = %config.guild_id))]
    pub async fn upsert_rotation_config(
        &self,
        config: &GuildRotationConfig,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO guild_rotation_settings
                (guild_id, enabled, title_role_id, schedule_expression,
                 timezone, notify_channel_id, grant_message, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            ON CONFLICT (guild_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                title_role_id = EXCLUDED.title_role_id,
                schedule_expression = EXCLUDED.schedule_expression,
                timezone = EXCLUDED.timezone,
                notify_channel_id = EXCLUDED.notify_channel_id,
                grant_message = EXCLUDED.grant_message,
                updated_at = NOW()
            "#,
        )
        .bind(config.guild_id)
        .bind(config.enabled)
        .bind(config.title_role_id)
        .bind(config.schedule_expression.as_deref())
        .bind(config.timezone.map(|tz| tz.to_string()))
        .bind(config.notify_channel_id)
        .bind(config.grant_message.as_deref())
        .execute(self.pool.pool())
        .await?;

        tracing::debug!("Rotation settings upserted");
        Ok(())
    }
}

#[async_trait]
impl GuildConfigStore for PgGuildConfigStore {
    #[instrument(skip(self))]
    async fn rotation_config(&self, guild_id: GuildId) -> Result<GuildRotationConfig, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT enabled, title_role_id, schedule_expression,
                   timezone, notify_channel_id, grant_message
            FROM guild_rotation_settings
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id)
        .fetch_optional(self.pool.pool())
        .await?;

        let Some(row) = row else {
            return Ok(GuildRotationConfig::disabled(guild_id));
        };

        let timezone = match row.try_get::<Option<String>, _>("timezone")? {
            Some(name) => match parse_timezone(&name) {
                Ok(tz) => Some(tz),
                Err(_) => {
                    // An unknown zone name falls back to the service default
                    // rather than making the whole guild unschedulable.
                    tracing::warn!(%guild_id, timezone = %name, "Ignoring unknown timezone");
                    None
                }
            },
            None => None,
        };

        Ok(GuildRotationConfig {
            guild_id,
            enabled: row.try_get("enabled")?,
            title_role_id: row.try_get::<Option<i64>, _>("title_role_id")?.map(RoleId),
            schedule_expression: row.try_get("schedule_expression")?,
            timezone,
            notify_channel_id: row
                .try_get::<Option<i64>, _>("notify_channel_id")?
                .map(ChannelId),
            grant_message: row.try_get("grant_message")?,
        })
    }

    #[instrument(skip(self))]
    async fn enabled_guild_ids(&self) -> Result<Vec<GuildId>, StoreError> {
        let rows = sqlx::query(
            "SELECT guild_id FROM guild_rotation_settings WHERE enabled = TRUE ORDER BY guild_id",
        )
        .fetch_all(self.pool.pool())
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("guild_id").map(GuildId))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = ids.len(), "Loaded rotation-enabled guilds");
        Ok(ids)
    }
}

/// Points leaderboard backed by the `leaderboard_points` table.
pub struct PgLeaderboardStore {
    pool: DbPool,
}

impl PgLeaderboardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Admin score adjustment. Creates the row when absent; a negative
    /// delta can take a score below zero, which ranks like any other value.
    #[instrument(skip(self))]
    pub async fn add_points(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO leaderboard_points (guild_id, user_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild_id, user_id)
                DO UPDATE SET score = leaderboard_points.score + EXCLUDED.score
            RETURNING score
            "#,
        )
        .bind(guild_id)
        .bind(user_id)
        .bind(delta)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(row.try_get("score")?)
    }
}

#[async_trait]
impl LeaderboardStore for PgLeaderboardStore {
    #[instrument(skip(self))]
    async fn top_entries(
        &self,
        guild_id: GuildId,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, score
            FROM leaderboard_points
            WHERE guild_id = $1
            ORDER BY score DESC, user_id ASC
            LIMIT $2
            "#,
        )
        .bind(guild_id)
        .bind(limit)
        .fetch_all(self.pool.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(LeaderboardEntry {
                    user_id: UserId(row.try_get("user_id")?),
                    score: row.try_get("score")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn clear_points(&self, guild_id: GuildId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM leaderboard_points WHERE guild_id = $1")
            .bind(guild_id)
            .execute(self.pool.pool())
            .await?;

        tracing::info!(%guild_id, rows = result.rows_affected(), "Leaderboard cleared");
        Ok(())
    }
}
