// Chat-platform seam: membership, role mutation, message delivery

mod rest;

pub use rest::RestGateway;

use crate::errors::GatewayError;
use crate::models::{ChannelId, GuildId, RoleId, UserId};
use async_trait::async_trait;

/// Operations the rotation core needs from the chat platform.
///
/// Every mutating call may fail independently; the executor records failures
/// per member instead of propagating them. Implementations must not retry;
/// the next scheduled cycle is the retry mechanism.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipGateway: Send + Sync {
    /// Whether the role still exists in the guild.
    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> Result<bool, GatewayError>;

    /// Whether the user is currently a member of the guild.
    async fn is_member(&self, guild_id: GuildId, user_id: UserId) -> Result<bool, GatewayError>;

    /// Every member currently holding the role.
    async fn role_holders(
        &self,
        guild_id: GuildId,
        role_id: RoleId,
    ) -> Result<Vec<UserId>, GatewayError>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GatewayError>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(), GatewayError>;

    /// Best-effort text message. Callers swallow failures; sending must
    /// never abort a cycle.
    async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), GatewayError>;
}
