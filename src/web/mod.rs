//! Web server for OAuth + CAPTCHA verification
//!
//! Runs alongside the Discord bot. Role changes requested here are handed to
//! the bot through the bridge, never executed on the request path.

mod captcha;
mod error;
mod oauth;
mod pages;
mod server;

pub use server::{start_web_server, AppState};
