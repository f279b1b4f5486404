// src/messages.rs

use poise::serenity_prelude::UserId;
use std::time::Duration;

pub const PANEL_TITLE: &str = "Verification";
pub const PANEL_DESCRIPTION: &str = "Press the button below to verify that you are human.";
pub const PANEL_FOOTER: &str = "Web Verify System";
pub const PANEL_BUTTON_LABEL: &str = "Verify";

pub fn fallback_confirmation(user_id: UserId) -> String {
    format!("<@{}> you have been verified.", user_id)
}

/// Reply to `/ping`; a zero latency means no heartbeat has been measured yet
pub fn ping_reply(latency: Duration) -> String {
    if latency.is_zero() {
        "Pong! Verification bot is online.".to_string()
    } else {
        format!(
            "Pong! Verification bot is online (gateway latency {} ms).",
            latency.as_millis()
        )
    }
}
