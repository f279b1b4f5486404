//! Process configuration, read once from the environment at startup

pub mod env;

use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
pub use env::EnvReader;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";
pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
pub const DEFAULT_RECAPTCHA_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_FALLBACK_PHRASE: &str = "please verify";

/// Ids of everything the bot touches in its single guild
#[derive(Debug, Clone)]
pub struct GuildConfig {
    pub guild_id: GuildId,
    pub verified_role: RoleId,
    pub failed_role: RoleId,
    pub support_role: RoleId,
    pub support_channel: ChannelId,
    pub log_channel: ChannelId,
    /// Literal message that triggers the fallback verification
    pub fallback_phrase: String,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Base for the token and profile endpoints
    pub api_base: String,
}

impl OAuthConfig {
    /// URL the verification button sends users to
    pub fn authorize_url(&self) -> String {
        format!(
            "https://discord.com/api/oauth2/authorize?client_id={}&redirect_uri={}&response_type=code&scope=identify",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri)
        )
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.api_base.trim_end_matches('/'))
    }

    pub fn profile_url(&self) -> String {
        format!("{}/users/@me", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    pub site_key: String,
    pub secret_key: String,
    pub verify_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub port: u16,
    pub support_invite_url: Option<String>,
}

/// Everything the bot needs, immutable after startup
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub guild: GuildConfig,
    pub oauth: OAuthConfig,
    pub captcha: CaptchaConfig,
    pub web: WebConfig,
    pub status_interval: Duration,
}

pub type SharedBotConfig = Arc<BotConfig>;

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_reader(&EnvReader::new(|name: &str| std::env::var(name).ok()))
    }

    pub fn from_reader<F>(env: &EnvReader<F>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let guild = GuildConfig {
            guild_id: GuildId::new(env.required_id("DISCORD_GUILD_ID")?),
            verified_role: RoleId::new(env.required_id("VERIFY_ROLE_ID")?),
            failed_role: RoleId::new(env.required_id("FAIL_ROLE_ID")?),
            support_role: RoleId::new(env.required_id("SUPPORT_ROLE_ID")?),
            support_channel: ChannelId::new(env.required_id("SUPPORT_CHANNEL_ID")?),
            log_channel: ChannelId::new(env.required_id("LOG_CHANNEL_ID")?),
            fallback_phrase: env
                .optional("FALLBACK_PHRASE")
                .unwrap_or_else(|| DEFAULT_FALLBACK_PHRASE.to_string()),
        };

        let oauth = OAuthConfig {
            client_id: env.required("DISCORD_CLIENT_ID")?,
            client_secret: env.required("DISCORD_CLIENT_SECRET")?,
            redirect_uri: env.required("OAUTH_REDIRECT_URI")?,
            api_base: env
                .optional("DISCORD_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        };

        let captcha = CaptchaConfig {
            site_key: env.required("RECAPTCHA_SITE_KEY")?,
            secret_key: env.required("RECAPTCHA_SECRET_KEY")?,
            verify_url: env
                .optional("RECAPTCHA_VERIFY_URL")
                .unwrap_or_else(|| DEFAULT_RECAPTCHA_VERIFY_URL.to_string()),
            timeout: Duration::from_secs(
                env.parsed_nonzero_or("RECAPTCHA_TIMEOUT_SECS", DEFAULT_RECAPTCHA_TIMEOUT_SECS)?,
            ),
        };

        let web = WebConfig {
            port: env.parsed_or("PORT", DEFAULT_PORT)?,
            support_invite_url: env.optional("SUPPORT_INVITE_URL"),
        };

        Ok(Self {
            discord_token: env.required("DISCORD_TOKEN")?,
            guild,
            oauth,
            captcha,
            web,
            status_interval: Duration::from_secs(
                env.parsed_nonzero_or("STATUS_INTERVAL_SECS", DEFAULT_STATUS_INTERVAL_SECS)?,
            ),
        })
    }
}

#[cfg(test)]
fn test_vars(api_base: &str, verify_url: &str) -> std::collections::HashMap<&'static str, String> {
    [
        ("DISCORD_TOKEN", "token".to_string()),
        ("DISCORD_CLIENT_ID", "1111".to_string()),
        ("DISCORD_CLIENT_SECRET", "client-secret".to_string()),
        ("OAUTH_REDIRECT_URI", "https://verify.example.com/callback".to_string()),
        ("DISCORD_GUILD_ID", "100".to_string()),
        ("VERIFY_ROLE_ID", "200".to_string()),
        ("FAIL_ROLE_ID", "201".to_string()),
        ("SUPPORT_ROLE_ID", "202".to_string()),
        ("SUPPORT_CHANNEL_ID", "300".to_string()),
        ("LOG_CHANNEL_ID", "301".to_string()),
        ("RECAPTCHA_SITE_KEY", "site-key-xyz".to_string()),
        ("RECAPTCHA_SECRET_KEY", "captcha-secret".to_string()),
        ("SUPPORT_INVITE_URL", "https://discord.gg/support".to_string()),
        ("DISCORD_API_BASE", api_base.to_string()),
        ("RECAPTCHA_VERIFY_URL", verify_url.to_string()),
        ("RECAPTCHA_TIMEOUT_SECS", "2".to_string()),
    ]
    .into_iter()
    .collect()
}

/// Config with fixed ids, pointing upstream calls at `api_base` and `verify_url`
#[cfg(test)]
pub(crate) fn test_config(api_base: &str, verify_url: &str) -> BotConfig {
    let vars = test_vars(api_base, verify_url);
    BotConfig::from_reader(&EnvReader::new(move |name: &str| vars.get(name).cloned()))
        .expect("test config is complete")
}
