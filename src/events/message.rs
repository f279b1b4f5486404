use poise::serenity_prelude::{self as serenity, ChannelId};
use tracing::debug;

use crate::config::GuildConfig;
use crate::managers::{run_fallback_verification, SerenityGateway};
use crate::{Data, Error};

/// Whether a message asks for fallback verification
pub fn is_fallback_request(
    author_is_bot: bool,
    channel_id: ChannelId,
    content: &str,
    config: &GuildConfig,
) -> bool {
    !author_is_bot
        && channel_id == config.support_channel
        && content.trim() == config.fallback_phrase
}

/// Handle incoming messages
pub async fn handle_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    let config = &data.config.guild;
    if !is_fallback_request(msg.author.bot, msg.channel_id, &msg.content, config) {
        return Ok(());
    }

    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    debug!("Fallback verification requested by {}", msg.author.name);
    let gateway = SerenityGateway::from_context(ctx);
    run_fallback_verification(
        &gateway,
        config,
        guild_id,
        msg.author.id,
        msg.channel_id,
        msg.id,
    )
    .await;

    Ok(())
}
