//! Discord OAuth code exchange and profile lookup

use serde::Deserialize;
use tracing::{debug, error};

use super::error::WebError;
use crate::config::OAuthConfig;

/// Discord OAuth token response. `access_token` is optional because Discord
/// answers some failures with a 2xx body that lacks it.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
}

/// Discord user info from /users/@me
#[derive(Deserialize, Debug, Clone)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
}

impl DiscordUser {
    /// Global display name when set, account username otherwise
    pub fn display_name(&self) -> &str {
        match self.global_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Trade an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, WebError> {
        let response = self
            .http_client
            .post(self.config.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Failed to exchange code: {}", e);
                WebError::upstream("token exchange", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed: {} - {}", status, error_text);
            return Err(WebError::upstream("token exchange", status));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!("Failed to parse token response: {}", e);
            WebError::NoAccessToken
        })?;
        debug!("Token type: {:?}", token.token_type);

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(WebError::NoAccessToken)
    }

    /// Profile of the user the access token belongs to
    pub async fn fetch_user(&self, access_token: &str) -> Result<DiscordUser, WebError> {
        let response = self
            .http_client
            .get(self.config.profile_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to get user info: {}", e);
                WebError::upstream("profile fetch", e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("User info request failed: {} - {}", status, error_text);
            return Err(WebError::upstream("profile fetch", status));
        }

        response.json::<DiscordUser>().await.map_err(|e| {
            error!("Failed to parse user info: {}", e);
            WebError::upstream("profile fetch", e)
        })
    }
}
