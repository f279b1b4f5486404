//! Presence text with host resource usage

use poise::serenity_prelude::{self as serenity, ActivityData};
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tracing::{debug, info};

/// Discord rejects longer custom statuses
const MAX_STATUS_LEN: usize = 128;

/// One reading of the host
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: Option<f32>,
    pub net_received: u64,
    pub net_transmitted: u64,
    pub guild_count: usize,
}

impl ResourceSnapshot {
    pub fn status_text(&self) -> String {
        let mut parts = vec![
            format!("CPU {:.0}%", self.cpu_percent),
            format!("MEM {:.0}%", self.memory_percent),
        ];
        if let Some(disk) = self.disk_percent {
            parts.push(format!("DISK {:.0}%", disk));
        }
        parts.push(format!(
            "NET ↓{} ↑{}",
            format_bytes(self.net_received),
            format_bytes(self.net_transmitted)
        ));
        parts.push(format!(
            "{} guild{}",
            self.guild_count,
            if self.guild_count == 1 { "" } else { "s" }
        ));

        let text = parts.join(" | ");
        if text.chars().count() > MAX_STATUS_LEN {
            text.chars().take(MAX_STATUS_LEN).collect()
        } else {
            text
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    }
}

/// Keeps sysinfo handles alive between samples so CPU usage has a baseline
pub struct ResourceSampler {
    system: System,
    networks: Networks,
    disks: Disks,
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
        }
    }

    pub async fn sample(&mut self, guild_count: usize) -> ResourceSnapshot {
        // CPU usage is a delta, so it needs two refreshes
        self.system.refresh_cpu();
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.networks.refresh();
        self.disks.refresh();

        let (disk_total, disk_available) = self
            .disks
            .list()
            .iter()
            .fold((0u64, 0u64), |(total, available), disk| {
                (total + disk.total_space(), available + disk.available_space())
            });

        let (net_received, net_transmitted) = self
            .networks
            .list()
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.total_received(), tx + data.total_transmitted())
            });

        ResourceSnapshot {
            cpu_percent: self.system.global_cpu_info().cpu_usage(),
            memory_percent: percent(self.system.used_memory(), self.system.total_memory()),
            disk_percent: (disk_total > 0)
                .then(|| percent(disk_total - disk_available, disk_total)),
            net_received,
            net_transmitted,
            guild_count,
        }
    }
}

/// Publish the presence every `interval` for as long as the client runs
pub async fn run_status_reporter(ctx: serenity::Context, interval: Duration) {
    info!("Status reporter started (every {}s)", interval.as_secs());
    let mut sampler = ResourceSampler::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let snapshot = sampler.sample(ctx.cache.guild_count()).await;
        let text = snapshot.status_text();
        debug!("Updating presence: {}", text);
        ctx.set_activity(Some(ActivityData::custom(text)));
    }
}
