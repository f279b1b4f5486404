use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot that verifies members through OAuth and reCAPTCHA
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Register commands in the configured guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

mod commands;
mod config;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod web;

use commands::{help, ping, verify_panel};
use config::{BotConfig, SharedBotConfig};
use events::handle_message;
use managers::{
    bridge_channel, create_shared_bridge_handle, run_bridge, run_status_reporter,
    SerenityGateway, SharedBridgeHandle,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: SharedBotConfig,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if let Err(e) = handle_message(ctx, new_message, data).await {
            error!("Failed to handle message: {}", e);
        }
    }
    Ok(())
}

/// Application id encoded in the first segment of a bot token
fn application_id_from_token(token: &str) -> Option<String> {
    use base64::Engine;

    let segment = token.split('.').next()?;
    let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(segment)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment))
        .ok()?;
    String::from_utf8(decoded)
        .ok()
        .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
}

/// Runs once the gateway reports ready: publish the bridge and start the
/// background workers
fn start_bot_workers(ctx: &serenity::Context, config: &BotConfig, bridge: &SharedBridgeHandle) {
    let (sender, receiver) = bridge_channel();
    if bridge.publish(sender) {
        let gateway = Arc::new(SerenityGateway::from_context(ctx));
        tokio::spawn(run_bridge(gateway, config.guild.clone(), receiver));
        info!("Discord bridge ready, web verification enabled");
    } else {
        warn!("Discord bridge was already published, keeping the existing worker");
    }

    tokio::spawn(run_status_reporter(ctx.clone(), config.status_interval));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init(logging::parse_level(&args.log_level));

    let config: SharedBotConfig = Arc::new(BotConfig::from_env()?);

    if let Some(app_id) = application_id_from_token(&config.discord_token) {
        info!(
            "Bot ID: {} (configure intents at https://discord.com/developers/applications/{}/bot)",
            app_id, app_id
        );
    }

    // The web server comes up before the bot; /verify answers 503 until ready
    let bridge = create_shared_bridge_handle();
    let web_state = web::AppState::new(config.clone(), bridge.clone());
    tokio::spawn(async move {
        if let Err(e) = web::start_web_server(web_state).await {
            error!("Web server error: {}", e);
        }
    });

    let guild_commands = args.guild_commands;
    if guild_commands {
        info!("--guild-commands: Will register commands in guild {}", config.guild.guild_id);
    } else {
        info!("Registering commands globally by default (takes up to 1 hour to propagate)");
    }

    let setup_config = config.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), verify_panel()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx.say(format!("An error occurred: {}", error)).await;
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            warn!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = setup_config.clone();
            let bridge = bridge.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                if guild_commands {
                    let guild_id = config.guild.guild_id;
                    if let Err(e) = poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        guild_id,
                    ).await {
                        error!("Failed to register commands for guild {}: {}", guild_id, e);
                    } else {
                        info!("Successfully registered {} commands for guild {}",
                              framework.options().commands.len(), guild_id);
                    }
                } else if let Err(e) = poise::builtins::register_globally(
                    ctx,
                    &framework.options().commands,
                ).await {
                    error!("Failed to register commands globally: {}", e);
                } else {
                    info!("Successfully registered {} commands globally",
                          framework.options().commands.len());
                }

                start_bot_workers(ctx, &config, &bridge);

                Ok(Data { config })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Requesting privileged intents: [\"GUILD_MEMBERS\", \"MESSAGE_CONTENT\"]");

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        let err_str = e.to_string();
        if err_str.contains("Disallowed") || err_str.contains("intents") {
            error!("Failed to start bot: {}", e);
            error!("Enable GUILD_MEMBERS and MESSAGE_CONTENT under Bot -> Privileged Gateway Intents");
            return Err(anyhow::anyhow!(
                "Disallowed gateway intents. Enable GUILD_MEMBERS and MESSAGE_CONTENT in the Discord Developer Portal"
            ));
        }
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_id_from_token() {
        // "123456789012345678" base64-encoded, then two dummy segments
        let token = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GaBcDe.signature";
        assert_eq!(
            application_id_from_token(token).as_deref(),
            Some("123456789012345678")
        );
        assert_eq!(application_id_from_token("not-a-token"), None);
    }
}
