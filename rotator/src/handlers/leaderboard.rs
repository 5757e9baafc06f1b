// Leaderboard display and admin score adjustment

use axum::extract::{Path, Query, State};
use axum::Json;
use common::models::{GuildId, LeaderboardEntry, UserId};
use serde::{Deserialize, Serialize};

use super::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustPointsRequest {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
pub struct AdjustPointsResponse {
    pub user_id: UserId,
    pub score: i64,
}

/// Ranked leaderboard entries for a guild.
#[tracing::instrument(skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    use common::stores::LeaderboardStore;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let entries = state
        .leaderboard
        .top_entries(GuildId(guild_id), limit)
        .await?;
    Ok(Json(entries))
}

/// Apply an admin score adjustment and report the resulting score.
#[tracing::instrument(skip(state))]
pub async fn adjust_points(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(i64, i64)>,
    Json(request): Json<AdjustPointsRequest>,
) -> Result<Json<AdjustPointsResponse>, AppError> {
    let user_id = UserId(user_id);
    let score = state
        .leaderboard
        .add_points(GuildId(guild_id), user_id, request.delta)
        .await?;
    Ok(Json(AdjustPointsResponse { user_id, score }))
}
