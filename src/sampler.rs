//! Background disk-usage sampler
//!
//! Periodically overwrites `disk_space_used_bytes` with the amount of memory
//! in use (`total - available`). This is a placeholder reading and deliberately
//! not real disk telemetry.

use std::time::Duration;
use sysinfo::System;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::metrics::Metrics;

/// Source of the "used bytes" reading taken on every tick
pub trait MemorySource: Send + 'static {
    fn used_bytes(&mut self) -> u64;
}

/// Reads OS memory totals through `sysinfo`
pub struct SystemMemory {
    system: System,
}

impl SystemMemory {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for SystemMemory {
    fn used_bytes(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system
            .total_memory()
            .saturating_sub(self.system.available_memory())
    }
}

/// Repeating task that feeds the disk-usage gauge
pub struct DiskUsageSampler;

impl DiskUsageSampler {
    /// Spawn the sampler on the current tokio runtime
    ///
    /// The first sample is taken one full `period` after spawning, then every
    /// `period`. The task exits once `cancel` is cancelled.
    pub fn spawn<S: MemorySource>(
        metrics: Metrics,
        mut source: S,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_seconds = period.as_secs_f64(),
                "Starting disk usage sampler"
            );

            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Disk usage sampler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let used = source.used_bytes();
                        metrics.set_disk_space_used(used);
                        tracing::trace!(used_bytes = used, "Sampled disk usage");
                    }
                }
            }
        })
    }
}
