// Error types, one enum per concern

use crate::models::{RoleId, UserId};
use thiserror::Error;

/// Schedule-expression errors
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Cron expression '{expression}' has no upcoming fire time")]
    NoUpcomingFire { expression: String },
}

/// Persistence errors from the settings and leaderboard stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Store health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Malformed row: {0}")]
    InvalidRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionFailed(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::InvalidRow(err.to_string())
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Chat-platform gateway errors. Every mutating call can fail independently;
/// the rotation executor records these rather than propagating them.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing permissions: {0}")]
    MissingPermissions(String),

    #[error("Unknown member: {0}")]
    UnknownMember(UserId),

    #[error("Unknown role: {0}")]
    UnknownRole(RoleId),

    #[error("Gateway transport error: {0}")]
    Transport(String),

    #[error("Malformed gateway payload: {0}")]
    InvalidPayload(String),

    #[error("Unexpected gateway response {status}: {detail}")]
    UnexpectedStatus { status: u16, detail: String },
}

impl GatewayError {
    /// True when the failure is a permission/role-hierarchy problem the
    /// operator can fix, as opposed to a transient transport fault.
    pub fn is_permission(&self) -> bool {
        matches!(self, GatewayError::MissingPermissions(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Scheduling-decision errors surfaced to callers of the scheduler.
///
/// On either variant the guild's previously installed job, if any, is left
/// untouched; transient lookup failures never cancel speculatively.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Rotation is not configured for guild {0}")]
    NotConfigured(crate::models::GuildId),
}

/// Error envelope returned by the admin API
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::new("STORE_ERROR", err.to_string())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        ApiError::new("SCHEDULE_ERROR", err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::new("GATEWAY_ERROR", err.to_string())
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(e) => e.into(),
            SchedulerError::Gateway(e) => e.into(),
            SchedulerError::NotConfigured(_) => ApiError::new("NOT_CONFIGURED", err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_display() {
        let err = ScheduleError::InvalidExpression {
            expression: "* * *".to_string(),
            reason: "too few fields".to_string(),
        };
        assert!(err.to_string().contains("Invalid cron expression"));
        assert!(err.to_string().contains("* * *"));
    }

    #[test]
    fn test_gateway_error_permission_classification() {
        assert!(GatewayError::MissingPermissions("hierarchy".into()).is_permission());
        assert!(!GatewayError::Transport("reset".into()).is_permission());
        assert!(!GatewayError::UnknownMember(UserId(1)).is_permission());
    }

    #[test]
    fn test_store_error_to_api_error() {
        let api: ApiError = StoreError::QueryFailed("boom".into()).into();
        assert_eq!(api.code, "STORE_ERROR");
        assert!(api.message.contains("boom"));
    }

    #[test]
    fn test_api_error_with_details() {
        let api = ApiError::new("TEST_ERROR", "message")
            .with_details(serde_json::json!({"field": "value"}));
        assert!(api.details.is_some());
    }
}
