//! Per-client prompt quota.
//!
//! Counters live for the process lifetime and only ever go up. The charge is
//! taken when a request is admitted, before the backend is called, so a failed
//! or timed-out backend call still counts (pay-on-attempt).

use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Limit Reached. ({limit} Prompts Max)")]
pub struct QuotaExceeded {
    pub client: String,
    pub limit: u32,
}

pub struct QuotaTracker {
    ceiling: u32,
    usage: RwLock<HashMap<String, u32>>,
}

impl QuotaTracker {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            usage: RwLock::new(HashMap::new()),
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Charge one prompt to `client`.
    ///
    /// The write lock is held across the check and the increment, so two
    /// concurrent requests can never both see the last free slot.
    pub async fn check_and_consume(&self, client: &str) -> Result<u32, QuotaExceeded> {
        let mut usage = self.usage.write().await;
        let count = usage.entry(client.to_string()).or_insert(0);

        if *count >= self.ceiling {
            warn!("Quota exhausted for {} ({}/{})", client, count, self.ceiling);
            return Err(QuotaExceeded {
                client: client.to_string(),
                limit: self.ceiling,
            });
        }

        *count += 1;
        debug!("Quota for {}: {}/{}", client, count, self.ceiling);
        Ok(*count)
    }

    /// Prompts charged so far (0 for unseen clients)
    pub async fn usage(&self, client: &str) -> u32 {
        self.usage.read().await.get(client).copied().unwrap_or(0)
    }
}
