//! Web server implementation for OAuth + CAPTCHA verification

use axum::{
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    response::Html,
    routing::{get, post},
    Form, Router,
};
use poise::serenity_prelude::UserId;
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::captcha::CaptchaVerifier;
use super::error::WebError;
use super::oauth::OAuthClient;
use super::pages::{failure_page, success_page, verify_page};
use crate::config::SharedBotConfig;
use crate::managers::{AuditRecord, BridgeTask, SharedBridgeHandle, REASON_RECAPTCHA_FAILED};

const UNKNOWN_USERNAME: &str = "unknown";

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub config: SharedBotConfig,
    pub oauth: OAuthClient,
    pub captcha: CaptchaVerifier,
    pub bridge: SharedBridgeHandle,
}

impl AppState {
    pub fn new(config: SharedBotConfig, bridge: SharedBridgeHandle) -> Self {
        let http_client = reqwest::Client::new();
        Self {
            oauth: OAuthClient::new(config.oauth.clone(), http_client.clone()),
            captcha: CaptchaVerifier::new(config.captcha.clone(), http_client),
            config,
            bridge,
        }
    }
}

/// Query parameters from Discord OAuth callback
#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
}

/// Fields posted by the CAPTCHA page
#[derive(Deserialize)]
pub struct VerifyForm {
    user_id: Option<String>,
    username: Option<String>,
    #[serde(rename = "g-recaptcha-response")]
    recaptcha_response: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/callback", get(oauth_callback))
        .route("/verify", post(verify_submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails
pub async fn start_web_server(state: AppState) -> anyhow::Result<()> {
    let port = state.config.web.port;
    let redirect_uri = state.config.oauth.redirect_uri.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web server listening on http://{}", listener.local_addr()?);
    info!("=== Discord OAuth Configuration ===");
    info!("Redirect URI registered in the Developer Portal must be: {}", redirect_uri);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

/// GET /callback - OAuth callback handler
async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, WebError> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(WebError::MissingCode)?;

    let access_token = state.oauth.exchange_code(&code).await?;
    info!("Got access token, fetching user info...");

    let user = state.oauth.fetch_user(&access_token).await?;
    info!("User authenticated: {} ({})", user.username, user.id);

    Ok(Html(verify_page(
        state.captcha.site_key(),
        &user.id,
        user.display_name(),
    )))
}

/// First X-Forwarded-For hop, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn parse_user_id(raw: Option<&str>) -> Result<UserId, WebError> {
    match raw.map(str::trim).and_then(|s| s.parse::<u64>().ok()) {
        Some(id) if id != 0 => Ok(UserId::new(id)),
        _ => Err(WebError::InvalidUserId),
    }
}

/// POST /verify - CAPTCHA submission
async fn verify_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<VerifyForm>,
) -> Result<Html<String>, WebError> {
    if !state.bridge.is_ready() {
        warn!("Verification submitted before the bot is ready");
        return Err(WebError::BridgeNotReady);
    }

    let user_id = parse_user_id(form.user_id.as_deref())?;
    let username = form
        .username
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_USERNAME.to_string());
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let passed = state
        .captcha
        .verify(form.recaptcha_response.as_deref())
        .await;

    let guild = &state.config.guild;
    let (role_id, record) = if passed {
        (guild.verified_role, AuditRecord::success(user_id, username, ip))
    } else {
        (
            guild.failed_role,
            AuditRecord::failure(user_id, username, REASON_RECAPTCHA_FAILED, ip),
        )
    };

    for task in [
        BridgeTask::GrantRole { user_id, role_id },
        BridgeTask::Audit(record),
    ] {
        if let Err(e) = state.bridge.submit(task) {
            error!("Failed to schedule task for {}: {}", user_id, e);
        }
    }

    if passed {
        info!("User {} passed verification", user_id);
        Ok(Html(success_page()))
    } else {
        info!("User {} failed verification", user_id);
        Ok(Html(failure_page(
            state.config.web.support_invite_url.as_deref(),
            REASON_RECAPTCHA_FAILED,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::managers::{bridge_channel, create_shared_bridge_handle};
    use crate::managers::bridge::BridgeReceiver;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_for(server: &MockServer) -> AppState {
        let config = test_config(&server.base_url(), &server.url("/recaptcha/api/siteverify"));
        AppState::new(Arc::new(config), create_shared_bridge_handle())
    }

    fn ready_state(server: &MockServer) -> (AppState, BridgeReceiver) {
        let state = state_for(server);
        let (tx, rx) = bridge_channel();
        assert!(state.bridge.publish(tx));
        (state, rx)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn verify_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/verify")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn drain(rx: &mut BridgeReceiver) -> Vec<BridgeTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start_async().await;
        let response = router(state_for(&server))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_callback_without_code_makes_no_calls() {
        let server = MockServer::start_async().await;
        let token = server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token");
                then.status(200).json_body(json!({"access_token": "tok"}));
            })
            .await;

        for uri in ["/callback", "/callback?code="] {
            let response = router(state_for(&server))
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        token.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_callback_renders_captcha_page() {
        let server = MockServer::start_async().await;
        let token = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth2/token")
                    .body_contains("grant_type=authorization_code")
                    .body_contains("code=abc123");
                then.status(200)
                    .json_body(json!({"access_token": "tok", "token_type": "Bearer"}));
            })
            .await;
        let profile = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/users/@me")
                    .header("authorization", "Bearer tok");
                then.status(200).json_body(json!({"id": "42", "username": "alice"}));
            })
            .await;

        let response = router(state_for(&server))
            .oneshot(
                Request::builder()
                    .uri("/callback?code=abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("site-key-xyz"));
        assert!(body.contains(r#"name="user_id" value="42""#));
        assert!(body.contains("alice"));
        token.assert_async().await;
        profile.assert_async().await;
    }

    #[tokio::test]
    async fn test_callback_without_token_is_client_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token");
                then.status(200).json_body(json!({"error": "invalid_grant"}));
            })
            .await;
        let profile = server
            .mock_async(|when, then| {
                when.method(GET).path("/users/@me");
                then.status(200).json_body(json!({"id": "42", "username": "alice"}));
            })
            .await;

        let response = router(state_for(&server))
            .oneshot(
                Request::builder()
                    .uri("/callback?code=abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        profile.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_callback_upstream_failures_are_bad_gateway() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token").body_contains("code=bad");
                then.status(401).body("unauthorized");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/oauth2/token").body_contains("code=good");
                then.status(200).json_body(json!({"access_token": "tok"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/users/@me");
                then.status(500);
            })
            .await;

        for code in ["bad", "good"] {
            let response = router(state_for(&server))
                .oneshot(
                    Request::builder()
                        .uri(format!("/callback?code={}", code))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "code={}", code);
        }
    }

    #[tokio::test]
    async fn test_verify_before_ready_is_unavailable() {
        let server = MockServer::start_async().await;
        let captcha = server
            .mock_async(|when, then| {
                when.method(POST).path("/recaptcha/api/siteverify");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let state = state_for(&server);
        let bridge = state.bridge.clone();
        let response = router(state)
            .oneshot(verify_request("user_id=42&g-recaptcha-response=valid"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!bridge.is_ready());
        captcha.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_verify_success_schedules_verified_role() {
        let server = MockServer::start_async().await;
        let captcha = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/recaptcha/api/siteverify")
                    .body_contains("secret=captcha-secret")
                    .body_contains("response=valid");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let (state, mut rx) = ready_state(&server);
        let verified_role = state.config.guild.verified_role;
        let response = router(state)
            .oneshot(verify_request("user_id=42&username=alice&g-recaptcha-response=valid"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Verification Successful"));
        captcha.assert_async().await;

        let tasks = drain(&mut rx);
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0],
            BridgeTask::GrantRole {
                user_id: UserId::new(42),
                role_id: verified_role,
            }
        );
        match &tasks[1] {
            BridgeTask::Audit(record) => {
                assert!(record.success);
                assert_eq!(record.user_id, UserId::new(42));
                assert_eq!(record.username, "alice");
                assert_eq!(record.reason, None);
                assert_eq!(record.client_ip.as_deref(), Some("203.0.113.9"));
            }
            other => panic!("expected audit task, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_empty_token_schedules_failed_role() {
        let server = MockServer::start_async().await;
        let captcha = server
            .mock_async(|when, then| {
                when.method(POST).path("/recaptcha/api/siteverify");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let (state, mut rx) = ready_state(&server);
        let failed_role = state.config.guild.failed_role;
        let response = router(state)
            .oneshot(verify_request("user_id=42&g-recaptcha-response="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Verification Failed"));
        assert!(body.contains("https://discord.gg/support"));
        captcha.assert_hits_async(0).await;

        let tasks = drain(&mut rx);
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0],
            BridgeTask::GrantRole {
                user_id: UserId::new(42),
                role_id: failed_role,
            }
        );
        match &tasks[1] {
            BridgeTask::Audit(record) => {
                assert!(!record.success);
                assert_eq!(record.username, UNKNOWN_USERNAME);
                assert_eq!(record.reason.as_deref(), Some(REASON_RECAPTCHA_FAILED));
            }
            other => panic!("expected audit task, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verify_rejected_token_schedules_failed_role() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recaptcha/api/siteverify");
                then.status(200).json_body(json!({"success": false}));
            })
            .await;

        let (state, mut rx) = ready_state(&server);
        let failed_role = state.config.guild.failed_role;
        let response = router(state)
            .oneshot(verify_request("user_id=42&username=alice&g-recaptcha-response=bogus"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("RECAPTCHA_FAILED"));

        let tasks = drain(&mut rx);
        assert_eq!(tasks.len(), 2);
        assert!(matches!(
            tasks[0],
            BridgeTask::GrantRole { role_id, .. } if role_id == failed_role
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_user_id() {
        let server = MockServer::start_async().await;
        let (state, mut rx) = ready_state(&server);

        for body in ["g-recaptcha-response=valid", "user_id=abc", "user_id=0"] {
            let response = router(state.clone())
                .oneshot(verify_request(body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        }
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("192.0.2.1"));
        assert_eq!(client_ip(&headers, None), None);

        headers.insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer)).as_deref(), Some("198.51.100.7"));
    }
}
