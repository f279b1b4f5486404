//! reCAPTCHA site-verify client. Fails closed.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CaptchaConfig;

#[derive(Deserialize, Debug)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Clone)]
pub struct CaptchaVerifier {
    config: CaptchaConfig,
    http_client: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn new(config: CaptchaConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn site_key(&self) -> &str {
        &self.config.site_key
    }

    /// Whether the provider accepts `token`. Missing tokens are rejected
    /// without a request; timeouts and transport errors count as failure.
    pub async fn verify(&self, token: Option<&str>) -> bool {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                debug!("Empty CAPTCHA token, rejecting without provider call");
                return false;
            }
        };

        let response = match self
            .http_client
            .post(&self.config.verify_url)
            .timeout(self.config.timeout)
            .form(&[
                ("secret", self.config.secret_key.as_str()),
                ("response", token),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("CAPTCHA verification request failed: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!("CAPTCHA provider returned {}", response.status());
            return false;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) => {
                if !body.success {
                    debug!("CAPTCHA rejected: {:?}", body.error_codes);
                }
                body.success
            }
            Err(e) => {
                warn!("Unreadable CAPTCHA response: {}", e);
                false
            }
        }
    }
}
