//! Hand-off from the web server into the bot.
//!
//! Web handlers never touch Discord directly. They push a [`BridgeTask`] onto
//! an unbounded queue and return immediately; a single worker started from
//! the bot's ready hook drains the queue and runs the tasks one after another.
//! Until the bot is ready the handle holds no sender and submissions fail with
//! [`BotError::BridgeNotReady`].

use once_cell::sync::OnceCell;
use poise::serenity_prelude::{RoleId, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::audit::{send_audit, AuditRecord};
use super::gateway::DiscordGateway;
use super::role_manager::grant_role;
use crate::config::GuildConfig;
use crate::error::{BotError, Result};

/// Work scheduled by the web server
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeTask {
    GrantRole { user_id: UserId, role_id: RoleId },
    Audit(AuditRecord),
}

pub type BridgeSender = mpsc::UnboundedSender<BridgeTask>;
pub type BridgeReceiver = mpsc::UnboundedReceiver<BridgeTask>;

pub fn bridge_channel() -> (BridgeSender, BridgeReceiver) {
    mpsc::unbounded_channel()
}

/// Write-once slot for the queue sender
#[derive(Default)]
pub struct BridgeHandle {
    sender: OnceCell<BridgeSender>,
}

pub type SharedBridgeHandle = Arc<BridgeHandle>;

pub fn create_shared_bridge_handle() -> SharedBridgeHandle {
    Arc::new(BridgeHandle::default())
}

impl BridgeHandle {
    /// Store the sender. Returns false if one was already published.
    pub fn publish(&self, sender: BridgeSender) -> bool {
        self.sender.set(sender).is_ok()
    }

    pub fn is_ready(&self) -> bool {
        self.sender.get().is_some()
    }

    /// Enqueue a task without waiting for it to run
    pub fn submit(&self, task: BridgeTask) -> Result<()> {
        let sender = self.sender.get().ok_or(BotError::BridgeNotReady)?;
        sender.send(task).map_err(|_| BotError::BridgeClosed)
    }
}

/// Run one task against the gateway
pub async fn execute_task<G>(gateway: &G, config: &GuildConfig, task: BridgeTask)
where
    G: DiscordGateway + ?Sized,
{
    match task {
        BridgeTask::GrantRole { user_id, role_id } => {
            let outcome = grant_role(gateway, config.guild_id, user_id, role_id).await;
            if outcome.is_granted() {
                info!("Role {} for user {}: {}", role_id, user_id, outcome);
            } else {
                warn!("Role {} for user {} not granted: {}", role_id, user_id, outcome);
            }
        }
        BridgeTask::Audit(record) => {
            send_audit(gateway, config.log_channel, &record).await;
        }
    }
}

/// Worker loop; ends when every sender has been dropped
pub async fn run_bridge<G>(gateway: Arc<G>, config: GuildConfig, mut receiver: BridgeReceiver)
where
    G: DiscordGateway + ?Sized,
{
    info!("Discord bridge worker started");
    while let Some(task) = receiver.recv().await {
        debug!("Bridge task: {:?}", task);
        execute_task(gateway.as_ref(), &config, task).await;
    }
    info!("Discord bridge worker stopped");
}
