//! Append-only feedback log.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

pub struct FeedbackLog {
    path: PathBuf,
    // Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[timestamp] message` as one line. Embedded newlines are flattened.
    pub async fn append(&self, message: &str) -> std::io::Result<()> {
        let line = format!(
            "[{}] {}\n",
            Local::now().to_rfc3339(),
            message.replace(['\r', '\n'], " ")
        );

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open feedback log {}: {}", self.path.display(), e);
                e
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
