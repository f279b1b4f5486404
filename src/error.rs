use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Missing environment variable {name}")]
    MissingEnv { name: String },

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        name: String,
        value: String,
        reason: String,
    },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Bridge errors
    #[error("Discord bridge is not ready yet")]
    BridgeNotReady,

    #[error("Discord bridge worker has shut down")]
    BridgeClosed,
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
