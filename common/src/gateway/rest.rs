// REST implementation of the membership gateway
//
// Talks to a Discord-compatible HTTP API with bot-token authentication.
// Snowflakes arrive as decimal strings on the wire.

use crate::config::GatewayConfig;
use crate::errors::GatewayError;
use crate::models::{ChannelId, GuildId, RoleId, UserId};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

use super::MembershipGateway;

/// Page size for guild member listing; the platform caps at 1000.
const MEMBER_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MemberRecord {
    user: UserRecord,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoleRecord {
    id: String,
}

/// `MembershipGateway` backed by the platform's REST API.
pub struct RestGateway {
    client: Client,
    base_url: String,
}

impl RestGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&format!("Bot {}", config.bot_token))
            .map_err(|e| GatewayError::Transport(format!("Invalid bot token: {e}")))?;
        headers.insert(AUTHORIZATION, token);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn parse_snowflake(raw: &str) -> Result<i64, GatewayError> {
        raw.parse::<i64>()
            .map_err(|_| GatewayError::InvalidPayload(format!("Bad snowflake '{raw}'")))
    }

    /// Map a non-success role-mutation response to a typed cause.
    async fn mutation_error(response: Response, user_id: UserId) -> GatewayError {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        match status {
            StatusCode::FORBIDDEN => GatewayError::MissingPermissions(detail),
            StatusCode::NOT_FOUND => GatewayError::UnknownMember(user_id),
            _ => GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                detail,
            },
        }
    }
}

#[async_trait]
impl MembershipGateway for RestGateway {
    #[instrument(skip(self))]
    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/guilds/{guild_id}/roles")))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::UnexpectedStatus {
                status: response.status().as_u16(),
                detail: response.text().await.unwrap_or_default(),
            });
        }

        let roles: Vec<RoleRecord> = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

        for role in &roles {
            if Self::parse_snowflake(&role.id)? == role_id.0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    #[instrument(skip(self))]
    async fn is_member(&self, guild_id: GuildId, user_id: UserId) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/guilds/{guild_id}/members/{user_id}")))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(GatewayError::UnexpectedStatus {
                status: status.as_u16(),
                detail: response.text().await.unwrap_or_default(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn role_holders(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> Result<Vec<UserId>, GatewayError> {
        let wanted = role_id.0.to_string();
        let mut holders = Vec::new();
        let mut after = 0i64;

        // The member list is paginated by ascending user id.
        loop {
            let response = self
                .client
                .get(self.url(&format!("/guilds/{guild_id}/members")))
                .query(&[
                    ("limit", MEMBER_PAGE_LIMIT.to_string()),
                    ("after", after.to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(GatewayError::UnexpectedStatus {
                    status: response.status().as_u16(),
                    detail: response.text().await.unwrap_or_default(),
                });
            }

            let page: Vec<MemberRecord> = response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;
            let page_len = page.len();

            for member in page {
                let user_id = Self::parse_snowflake(&member.user.id)?;
                after = after.max(user_id);
                if member.roles.iter().any(|r| r == &wanted) {
                    holders.push(UserId(user_id));
                }
            }

            if page_len < MEMBER_PAGE_LIMIT {
                break;
            }
        }

        tracing::debug!(%guild_id, %role_id, count = holders.len(), "Resolved role holders");
        Ok(holders)
    }

    #[instrument(skip(self))]
    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .put(self.url(&format!(
                "/guilds/{guild_id}/members/{user_id}/roles/{role_id}"
            )))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::mutation_error(response, user_id).await)
        }
    }

    #[instrument(skip(self))]
    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!(
                "/guilds/{guild_id}/members/{user_id}/roles/{role_id}"
            )))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::mutation_error(response, user_id).await)
        }
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .json(&json!({ "content": text }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::UnexpectedStatus {
                status: response.status().as_u16(),
                detail: response.text().await.unwrap_or_default(),
            })
        }
    }
}
