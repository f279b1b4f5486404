use poise::serenity_prelude as serenity;
use tracing::info;

use crate::messages::{PANEL_BUTTON_LABEL, PANEL_DESCRIPTION, PANEL_FOOTER, PANEL_TITLE};
use crate::{Context, Error};

/// Build the panel message: one embed and a link button to the OAuth page
pub fn verification_panel(authorize_url: &str) -> poise::CreateReply {
    let embed = serenity::CreateEmbed::new()
        .title(PANEL_TITLE)
        .description(PANEL_DESCRIPTION)
        .footer(serenity::CreateEmbedFooter::new(PANEL_FOOTER))
        .color(0x2f3136);

    let button = serenity::CreateButton::new_link(authorize_url).label(PANEL_BUTTON_LABEL);

    poise::CreateReply::default()
        .embed(embed)
        .components(vec![serenity::CreateActionRow::Buttons(vec![button])])
}

/// Post the verification button
#[poise::command(slash_command, guild_only, rename = "verify-panel")]
pub async fn verify_panel(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let authorize_url = ctx.data().config.oauth.authorize_url();
    ctx.send(verification_panel(&authorize_url)).await?;

    info!(
        "Verification panel posted by {} in channel {}",
        ctx.author().name,
        ctx.channel_id()
    );
    Ok(())
}
