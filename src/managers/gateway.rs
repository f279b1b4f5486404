//! Narrow view of the Discord API used by the bridge and the fallback handler

use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, Cache, ChannelId, CreateMessage, GuildId, Http, MessageId, RoleId, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::audit::AuditRecord;
use crate::error::Result;

/// Guild, member, role and channel operations the bot performs.
///
/// Lookups that consult only local state are synchronous; anything that may
/// reach the HTTP API is async.
#[async_trait]
pub trait DiscordGateway: Send + Sync {
    /// Whether the guild is known locally
    fn has_guild(&self, guild_id: GuildId) -> bool;

    /// Whether the guild has a role with this id
    fn has_role(&self, guild_id: GuildId, role_id: RoleId) -> bool;

    /// Roles held by a member, falling back to the API when not cached.
    /// `Ok(None)` means the member does not exist.
    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()>;

    /// Whether the channel can be resolved (cache first, then API)
    async fn has_channel(&self, channel_id: ChannelId) -> bool;

    async fn send_audit(&self, channel_id: ChannelId, record: &AuditRecord) -> Result<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

    /// Post a message that removes itself after `lifetime`
    async fn send_transient(
        &self,
        channel_id: ChannelId,
        content: String,
        lifetime: Duration,
    ) -> Result<()>;
}

/// Gateway backed by the serenity cache and HTTP client
#[derive(Clone)]
pub struct SerenityGateway {
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(cache: Arc<Cache>, http: Arc<Http>) -> Self {
        Self { cache, http }
    }

    pub fn from_context(ctx: &serenity::Context) -> Self {
        Self::new(ctx.cache.clone(), ctx.http.clone())
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http_err) => {
            http_err.status_code().map(|s| s.as_u16()) == Some(404)
        }
        _ => false,
    }
}

#[async_trait]
impl DiscordGateway for SerenityGateway {
    fn has_guild(&self, guild_id: GuildId) -> bool {
        self.cache.guild(guild_id).is_some()
    }

    fn has_role(&self, guild_id: GuildId, role_id: RoleId) -> bool {
        self.cache
            .guild(guild_id)
            .map(|guild| guild.roles.contains_key(&role_id))
            .unwrap_or(false)
    }

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Vec<RoleId>>> {
        let cached = self
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).map(|m| m.roles.clone()));
        if let Some(roles) = cached {
            return Ok(Some(roles));
        }

        debug!("Member {} not cached, fetching from API", user_id);
        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(member.roles)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<()> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn has_channel(&self, channel_id: ChannelId) -> bool {
        if self.cache.channel(channel_id).is_some() {
            return true;
        }
        match self.http.get_channel(channel_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Could not resolve channel {}: {}", channel_id, e);
                false
            }
        }
    }

    async fn send_audit(&self, channel_id: ChannelId, record: &AuditRecord) -> Result<()> {
        channel_id
            .send_message(&self.http, CreateMessage::new().embed(record.to_embed()))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
        channel_id.delete_message(&self.http, message_id).await?;
        Ok(())
    }

    async fn send_transient(
        &self,
        channel_id: ChannelId,
        content: String,
        lifetime: Duration,
    ) -> Result<()> {
        let message = channel_id.say(&self.http, content).await?;
        let http = self.http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Err(e) = channel_id.delete_message(&http, message.id).await {
                warn!("Failed to delete transient message {}: {}", message.id, e);
            }
        });
        Ok(())
    }
}
