//! In-memory session store.
//!
//! Tokens are minted on a successful login and stay valid for the life of the
//! process. There is no expiry or logout.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use subtle::ConstantTimeEq;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Default)]
pub struct SessionStore {
    tokens: RwLock<HashSet<String>>,
    issued: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the supplied access code with the shared secret and mint a
    /// session token on match.
    pub async fn login(&self, supplied: &str, expected: &str) -> Option<String> {
        let matches: bool = supplied.as_bytes().ct_eq(expected.as_bytes()).into();
        if supplied.is_empty() || !matches {
            warn!("Login rejected: invalid access code");
            return None;
        }

        let token = self.mint_token(expected);
        let mut tokens = self.tokens.write().await;
        tokens.insert(token.clone());
        info!("Session issued ({} active)", tokens.len());
        Some(token)
    }

    /// True iff the token is present and was issued by this store
    pub async fn check_auth(&self, token: Option<&str>) -> bool {
        match token {
            Some(token) if !token.is_empty() => self.tokens.read().await.contains(token),
            _ => false,
        }
    }

    /// Number of sessions issued since startup
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Issuance time, a per-process counter and a random UUID, bound to the
    /// secret. The secret itself never appears in the token.
    fn mint_token(&self, secret: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let serial = self.issued.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(nanos.to_le_bytes());
        hasher.update(serial.to_le_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}
