use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::gateway::DiscordGateway;
use crate::config::GuildConfig;
use crate::messages::fallback_confirmation;

/// How long the fallback confirmation stays in the support channel
pub const CONFIRMATION_LIFETIME: Duration = Duration::from_secs(10);

const GRANT_REASON: &str = "Web verification";
const FALLBACK_REASON: &str = "Support channel verification";

/// Result of a single role grant.
///
/// Failures are never retried; the bridge only logs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyPresent,
    GuildNotFound,
    MemberNotFound,
    RoleNotFound,
    ApiError(String),
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantOutcome::Granted | GrantOutcome::AlreadyPresent)
    }
}

impl fmt::Display for GrantOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantOutcome::Granted => write!(f, "granted"),
            GrantOutcome::AlreadyPresent => write!(f, "already present"),
            GrantOutcome::GuildNotFound => write!(f, "guild not found"),
            GrantOutcome::MemberNotFound => write!(f, "member not found"),
            GrantOutcome::RoleNotFound => write!(f, "role not found"),
            GrantOutcome::ApiError(message) => write!(f, "API error: {}", message),
        }
    }
}

/// Give `role_id` to `user_id` in `guild_id`, resolving each piece first
pub async fn grant_role<G>(
    gateway: &G,
    guild_id: GuildId,
    user_id: UserId,
    role_id: RoleId,
) -> GrantOutcome
where
    G: DiscordGateway + ?Sized,
{
    if !gateway.has_guild(guild_id) {
        return GrantOutcome::GuildNotFound;
    }

    let current_roles = match gateway.member_roles(guild_id, user_id).await {
        Ok(Some(roles)) => roles,
        Ok(None) => return GrantOutcome::MemberNotFound,
        Err(e) => return GrantOutcome::ApiError(e.to_string()),
    };

    if !gateway.has_role(guild_id, role_id) {
        return GrantOutcome::RoleNotFound;
    }

    if current_roles.contains(&role_id) {
        debug!("User {} already has role {}", user_id, role_id);
        return GrantOutcome::AlreadyPresent;
    }

    match gateway.add_role(guild_id, user_id, role_id, GRANT_REASON).await {
        Ok(()) => GrantOutcome::Granted,
        Err(e) => GrantOutcome::ApiError(e.to_string()),
    }
}

/// What the fallback path managed to do
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub support_role_added: bool,
    pub failed_role_removed: bool,
    pub message_deleted: bool,
    pub confirmation_sent: bool,
}

impl FallbackOutcome {
    pub fn is_complete(&self) -> bool {
        self.support_role_added && self.message_deleted && self.confirmation_sent
    }
}

/// Support-channel verification: swap the failed role for the support role
/// and clean up the request message. Every step is attempted even when an
/// earlier one fails.
pub async fn run_fallback_verification<G>(
    gateway: &G,
    config: &GuildConfig,
    guild_id: GuildId,
    user_id: UserId,
    channel_id: ChannelId,
    message_id: MessageId,
) -> FallbackOutcome
where
    G: DiscordGateway + ?Sized,
{
    let mut outcome = FallbackOutcome::default();

    if gateway.has_role(guild_id, config.support_role) {
        match gateway
            .add_role(guild_id, user_id, config.support_role, FALLBACK_REASON)
            .await
        {
            Ok(()) => outcome.support_role_added = true,
            Err(e) => error!("Failed to add support role to {}: {}", user_id, e),
        }
    } else {
        warn!("Support role {} not found in guild {}", config.support_role, guild_id);
    }

    match gateway.member_roles(guild_id, user_id).await {
        Ok(Some(roles)) if roles.contains(&config.failed_role) => {
            match gateway
                .remove_role(guild_id, user_id, config.failed_role, FALLBACK_REASON)
                .await
            {
                Ok(()) => outcome.failed_role_removed = true,
                Err(e) => error!("Failed to remove failed role from {}: {}", user_id, e),
            }
        }
        Ok(_) => {}
        Err(e) => error!("Failed to look up roles for {}: {}", user_id, e),
    }

    match gateway.delete_message(channel_id, message_id).await {
        Ok(()) => outcome.message_deleted = true,
        Err(e) => error!("Failed to delete verification request {}: {}", message_id, e),
    }

    match gateway
        .send_transient(channel_id, fallback_confirmation(user_id), CONFIRMATION_LIFETIME)
        .await
    {
        Ok(()) => outcome.confirmation_sent = true,
        Err(e) => warn!("Failed to send confirmation to {}: {}", user_id, e),
    }

    if outcome.is_complete() {
        info!("Fallback verification completed for {}", user_id);
    } else {
        warn!(
            "Fallback verification for {} partially failed (failed role removed: {}): {:?}",
            user_id, outcome.failed_role_removed, outcome
        );
    }
    outcome
}
