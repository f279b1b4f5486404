use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{messages, Context, Error};

/// Check that the verification bot is online
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    info!("Ping from {} (gateway latency {:?})", ctx.author().name, latency);
    ctx.send(poise::CreateReply::default()
        .content(messages::ping_reply(latency))
        .ephemeral(true))
        .await?;
    Ok(())
}

/// Show help information
#[poise::command(prefix_command, slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let phrase = &ctx.data().config.guild.fallback_phrase;
    let embed = serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("Available commands:")
        .field("/ping", "Check if the bot is running", false)
        .field("/verify-panel", "Post the verification button in this channel", false)
        .field(
            "Support channel",
            format!("Write `{}` in the support channel to be verified manually", phrase),
            false,
        )
        .color(0x3498db);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}
