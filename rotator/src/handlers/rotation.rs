// Rotation settings endpoints: read, update (with reschedule), manual run

use axum::extract::{Path, State};
use axum::Json;
use common::errors::ApiError;
use common::models::{ChannelId, GuildId, GuildRotationConfig, RoleId, RotationOutcome};
use common::schedule::{parse_timezone, RotationSchedule};
use common::scheduler::ScheduleDecision;
use serde::Deserialize;

use super::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateRotationRequest {
    pub enabled: bool,
    pub title_role_id: Option<i64>,
    pub schedule_expression: Option<String>,
    pub timezone: Option<String>,
    pub notify_channel_id: Option<i64>,
    pub grant_message: Option<String>,
}

/// Current rotation settings for a guild.
#[tracing::instrument(skip(state))]
pub async fn get_rotation(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
) -> Result<Json<GuildRotationConfig>, AppError> {
    use common::stores::GuildConfigStore;

    let config = state
        .config_store
        .rotation_config(GuildId(guild_id))
        .await?;
    Ok(Json(config))
}

/// Upsert rotation settings, then re-evaluate the guild's schedule. This is
/// the reschedule-on-config-change path: the response carries the decision.
#[tracing::instrument(skip(state, request))]
pub async fn update_rotation(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
    Json(request): Json<UpdateRotationRequest>,
) -> Result<Json<ScheduleDecision>, AppError> {
    let guild_id = GuildId(guild_id);

    // Reject unparsable input up front; the scheduler would otherwise
    // silently cancel the guild's job on the next evaluation.
    let timezone = match request.timezone.as_deref() {
        Some(name) => Some(parse_timezone(name).map_err(|e| AppError::bad_request(e.into()))?),
        None => None,
    };
    if let Some(expression) = request.schedule_expression.as_deref() {
        RotationSchedule::parse(expression, timezone.unwrap_or(chrono_tz::Tz::UTC))
            .map_err(|e| AppError::bad_request(e.into()))?;
    }
    if request.enabled
        && (request.title_role_id.is_none() || request.schedule_expression.is_none())
    {
        return Err(AppError::bad_request(
            ApiError::new(
                "VALIDATION_ERROR",
                "Enabling rotation requires title_role_id and schedule_expression",
            )
            .with_details(serde_json::json!({
                "title_role_id": request.title_role_id,
                "schedule_expression": request.schedule_expression,
            })),
        ));
    }

    let config = GuildRotationConfig {
        guild_id,
        enabled: request.enabled,
        title_role_id: request.title_role_id.map(RoleId),
        schedule_expression: request.schedule_expression,
        timezone,
        notify_channel_id: request.notify_channel_id.map(ChannelId),
        grant_message: request.grant_message,
    };
    state.config_store.upsert_rotation_config(&config).await?;

    let decision = state.scheduler.schedule_guild(guild_id).await?;
    Ok(Json(decision))
}

/// Run one rotation cycle immediately.
#[tracing::instrument(skip(state))]
pub async fn run_rotation(
    State(state): State<AppState>,
    Path(guild_id): Path<i64>,
) -> Result<Json<RotationOutcome>, AppError> {
    let outcome = state.scheduler.run_now(GuildId(guild_id)).await?;
    Ok(Json(outcome))
}
