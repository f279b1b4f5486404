use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, ChannelId, UserId};
use tracing::{debug, error, info};

use super::gateway::DiscordGateway;

/// Reason recorded when the CAPTCHA check does not pass
pub const REASON_RECAPTCHA_FAILED: &str = "RECAPTCHA_FAILED";

const COLOR_SUCCESS: u32 = 0x2ecc71;
const COLOR_FAILURE: u32 = 0xe74c3c;

/// One verification outcome, posted to the log channel
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub user_id: UserId,
    pub username: String,
    pub success: bool,
    pub reason: Option<String>,
    pub client_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn success(user_id: UserId, username: impl Into<String>, client_ip: Option<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            success: true,
            reason: None,
            client_ip,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        user_id: UserId,
        username: impl Into<String>,
        reason: impl Into<String>,
        client_ip: Option<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            success: false,
            reason: Some(reason.into()),
            client_ip,
            timestamp: Utc::now(),
        }
    }

    pub fn title(&self) -> &'static str {
        if self.success {
            "✅ Verification succeeded"
        } else {
            "❌ Verification failed"
        }
    }

    pub fn to_embed(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(self.title())
            .field(
                "User",
                format!("<@{}> `{}` ({})", self.user_id, self.user_id, self.username),
                false,
            )
            .color(if self.success { COLOR_SUCCESS } else { COLOR_FAILURE });

        if let Ok(ts) = serenity::Timestamp::from_unix_timestamp(self.timestamp.timestamp()) {
            embed = embed.timestamp(ts);
        }

        if let Some(ip) = &self.client_ip {
            embed = embed.field("IP", format!("`{}`", ip), true);
        }
        if let Some(reason) = &self.reason {
            embed = embed.field("Reason", format!("`{}`", reason), true);
        }
        embed
    }
}

/// Post the record to the log channel; an unresolvable channel is skipped
pub async fn send_audit<G>(gateway: &G, log_channel: ChannelId, record: &AuditRecord) -> bool
where
    G: DiscordGateway + ?Sized,
{
    if !gateway.has_channel(log_channel).await {
        debug!("Log channel {} not available, dropping audit record", log_channel);
        return false;
    }

    match gateway.send_audit(log_channel, record).await {
        Ok(()) => {
            info!(
                "Logged verification {} for user {}",
                if record.success { "success" } else { "failure" },
                record.user_id
            );
            true
        }
        Err(e) => {
            error!("Failed to send audit record for {}: {}", record.user_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::gateway::fake::{Call, FakeGateway};

    #[test]
    fn test_embed_contents() {
        let record = AuditRecord::failure(
            UserId::new(42),
            "alice",
            REASON_RECAPTCHA_FAILED,
            Some("203.0.113.9".to_string()),
        );
        let value = serde_json::to_value(record.to_embed()).unwrap();
        assert_eq!(value["title"], "❌ Verification failed");

        let fields = value["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0]["value"], "<@42> `42` (alice)");
        assert_eq!(fields[1]["value"], "`203.0.113.9`");
        assert_eq!(fields[2]["value"], "`RECAPTCHA_FAILED`");
    }

    #[test]
    fn test_success_embed_omits_reason() {
        let record = AuditRecord::success(UserId::new(7), "bob", None);
        let value = serde_json::to_value(record.to_embed()).unwrap();
        assert_eq!(value["title"], "✅ Verification succeeded");
        assert_eq!(value["fields"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_log_channel_is_skipped() {
        let gateway = FakeGateway::standard();
        let record = AuditRecord::success(UserId::new(42), "alice", None);

        assert!(!send_audit(&gateway, ChannelId::new(999), &record).await);
        assert!(gateway.calls().is_empty());

        assert!(send_audit(&gateway, ChannelId::new(301), &record).await);
        assert_eq!(
            gateway.calls(),
            vec![Call::Audit(ChannelId::new(301), record)]
        );
    }
}
