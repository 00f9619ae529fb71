//! Resource fuse - fail-closed overload protection.
//!
//! A background task samples host CPU and RAM. A single RAM reading above the
//! ceiling blows the fuse immediately; CPU must stay above its ceiling for
//! `cpu_strike_threshold` consecutive readings. Once blown the fuse stays blown
//! until the process restarts, and every request is refused.
//!
//! Readers (admission pipeline, fuse middleware, status endpoint) only touch an
//! atomic flag and a watch-channel snapshot, never the sampler itself.

use crate::sampler::{ResourceSample, ResourceSampler};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use warden_common::FuseConfig;

/// Thresholds and timing for the sampling loop
#[derive(Debug, Clone, PartialEq)]
pub struct FuseLimits {
    pub cpu_limit_percent: f32,
    pub ram_limit_percent: f32,
    pub cpu_strike_threshold: u32,
    pub check_interval: Duration,
    pub grace_period: Duration,
}

impl Default for FuseLimits {
    fn default() -> Self {
        Self::from(&FuseConfig::default())
    }
}

impl From<&FuseConfig> for FuseLimits {
    fn from(config: &FuseConfig) -> Self {
        Self {
            cpu_limit_percent: config.cpu_limit_percent,
            ram_limit_percent: config.ram_limit_percent,
            cpu_strike_threshold: config.cpu_strike_threshold,
            check_interval: config.check_interval(),
            grace_period: config.grace_period(),
        }
    }
}

/// Diagnostic snapshot of the fuse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuseStatus {
    pub safe: bool,
    pub reason: Option<String>,
    pub cpu: f32,
    pub ram: f32,
    pub cpu_strikes: u32,
}

impl Default for FuseStatus {
    fn default() -> Self {
        Self {
            safe: true,
            reason: None,
            cpu: 0.0,
            ram: 0.0,
            cpu_strikes: 0,
        }
    }
}

pub struct ResourceFuse {
    limits: FuseLimits,
    blown: AtomicBool,
    monitoring: AtomicBool,
    snapshot: watch::Sender<FuseStatus>,
}

impl ResourceFuse {
    pub fn new(limits: FuseLimits) -> Self {
        let (snapshot, _) = watch::channel(FuseStatus::default());
        Self {
            limits,
            blown: AtomicBool::new(false),
            monitoring: AtomicBool::new(false),
            snapshot,
        }
    }

    /// True until the fuse blows
    pub fn is_safe(&self) -> bool {
        !self.blown.load(Ordering::Acquire)
    }

    pub fn status(&self) -> FuseStatus {
        self.snapshot.borrow().clone()
    }

    /// Reason recorded by the first blow, if any
    pub fn reason(&self) -> Option<String> {
        self.snapshot.borrow().reason.clone()
    }

    /// Receiver that wakes on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<FuseStatus> {
        self.snapshot.subscribe()
    }

    /// Blow the fuse. Only the first call has an effect; its reason is kept.
    ///
    /// The reason is written under the snapshot lock before the flag flips, so
    /// any reader that sees the fuse unsafe also sees why.
    pub fn blow(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let first = self.snapshot.send_if_modified(|status| {
            if status.reason.is_some() {
                return false;
            }
            status.safe = false;
            status.reason = Some(reason.clone());
            self.blown.store(true, Ordering::Release);
            true
        });

        if first {
            error!("[FUSE] BLOWN: {} | refusing all requests until restart", reason);
        } else {
            debug!("[FUSE] Already blown, ignoring: {}", reason);
        }
    }

    /// Apply one reading to the state machine.
    ///
    /// Readings are always recorded for diagnostics; strike counting and
    /// breach detection stop once the fuse has blown.
    pub fn record_sample(&self, sample: ResourceSample) {
        let armed = self.is_safe();
        let limits = &self.limits;
        let mut breach = None;

        self.snapshot.send_modify(|status| {
            status.cpu = sample.cpu_percent;
            status.ram = sample.ram_percent;

            if !armed {
                return;
            }

            if sample.cpu_percent > limits.cpu_limit_percent {
                status.cpu_strikes += 1;
            } else {
                status.cpu_strikes = 0;
            }

            if sample.ram_percent > limits.ram_limit_percent {
                breach = Some(format!("CRITICAL RAM LOAD: {:.1}%", sample.ram_percent));
            } else if status.cpu_strikes >= limits.cpu_strike_threshold {
                breach = Some(format!(
                    "CRITICAL CPU LOAD: {:.1}% (sustained over {} samples)",
                    sample.cpu_percent, status.cpu_strikes
                ));
            }
        });

        debug!(
            "[FUSE] cpu={:.1}% ram={:.1}%",
            sample.cpu_percent, sample.ram_percent
        );

        if let Some(reason) = breach {
            self.blow(reason);
        }
    }

    /// Spawn the sampling loop. Returns `None` if monitoring already started.
    pub fn start_monitoring<S: ResourceSampler>(self: &Arc<Self>, sampler: S) -> Option<JoinHandle<()>> {
        if self.monitoring.swap(true, Ordering::SeqCst) {
            warn!("[FUSE] Monitoring already running");
            return None;
        }

        info!(
            "[FUSE] System monitor started. Limits: CPU {}% x{}, RAM {}%",
            self.limits.cpu_limit_percent,
            self.limits.cpu_strike_threshold,
            self.limits.ram_limit_percent
        );

        let fuse = Arc::clone(self);
        Some(tokio::spawn(async move { fuse.monitor_loop(sampler).await }))
    }

    async fn monitor_loop<S: ResourceSampler>(&self, mut sampler: S) {
        sleep(self.limits.grace_period).await;

        let mut ticker = interval(self.limits.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let sample = sampler.sample().unwrap_or_else(|e| {
                warn!("[FUSE] Sampling failed, recording zero: {}", e);
                ResourceSample::default()
            });

            self.record_sample(sample);
        }
    }
}
