//! Errors surfaced to the browser

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::pages::error_page;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("No authorization code was provided")]
    MissingCode,

    #[error("Discord did not return an access token")]
    NoAccessToken,

    #[error("Invalid user id")]
    InvalidUserId,

    #[error("Upstream {service} failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("Verification is starting up, please try again shortly")]
    BridgeNotReady,
}

impl WebError {
    pub fn upstream(service: &'static str, cause: impl std::fmt::Display) -> Self {
        WebError::Upstream {
            service,
            message: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::MissingCode | WebError::NoAccessToken | WebError::InvalidUserId => {
                StatusCode::BAD_REQUEST
            }
            WebError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            WebError::BridgeNotReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown on the error page; upstream details stay in the logs
    fn public_message(&self) -> String {
        match self {
            WebError::Upstream { .. } => "Could not reach Discord. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status(), Html(error_page(&self.public_message()))).into_response()
    }
}
