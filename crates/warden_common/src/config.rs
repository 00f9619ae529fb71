//! Configuration management for wardend.
//!
//! Loads settings from /etc/warden/config.toml or uses defaults.
//! Everything is fixed at startup; there is no hot reload.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/warden/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/warden/config.toml";

/// Shipped placeholder secret; operators are expected to replace it
pub const PLACEHOLDER_ACCESS_CODE: &str = "CHANGE_ME";

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub fuse: FuseConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub firewall: FirewallConfig,
    #[serde(default)]
    pub executors: ExecutorsConfig,
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (all interfaces so LAN clients can reach it)
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory exposed read-only under /gallery
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: PathBuf,

    /// Append-only feedback log
    #[serde(default = "default_feedback_log")]
    pub feedback_log: PathBuf,

    /// Request bodies above this size are rejected
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_gallery_dir() -> PathBuf {
    PathBuf::from("gallery")
}

fn default_feedback_log() -> PathBuf {
    PathBuf::from("feedback.log")
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            gallery_dir: default_gallery_dir(),
            feedback_log: default_feedback_log(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ============================================================================
// Auth and quota
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Single shared access secret
    #[serde(default = "default_access_code")]
    pub access_code: String,

    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,
}

fn default_access_code() -> String {
    PLACEHOLDER_ACCESS_CODE.to_string()
}

fn default_cookie_name() -> String {
    "warden_session".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_code: default_access_code(),
            session_cookie_name: default_cookie_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Chat prompts allowed per client for the process lifetime
    #[serde(default = "default_max_prompts")]
    pub max_prompts_per_client: u32,
}

fn default_max_prompts() -> u32 {
    50
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_prompts_per_client: default_max_prompts(),
        }
    }
}

// ============================================================================
// Fuse
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuseConfig {
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit_percent: f32,

    #[serde(default = "default_ram_limit")]
    pub ram_limit_percent: f32,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Delay before the first sample, covers process warm-up
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    /// Consecutive over-limit CPU samples needed to blow
    #[serde(default = "default_cpu_strikes")]
    pub cpu_strike_threshold: u32,
}

fn default_cpu_limit() -> f32 {
    98.0
}

fn default_ram_limit() -> f32 {
    96.0
}

fn default_check_interval() -> u64 {
    2
}

fn default_grace_period() -> u64 {
    20
}

fn default_cpu_strikes() -> u32 {
    5
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            cpu_limit_percent: default_cpu_limit(),
            ram_limit_percent: default_ram_limit(),
            check_interval_secs: default_check_interval(),
            grace_period_secs: default_grace_period(),
            cpu_strike_threshold: default_cpu_strikes(),
        }
    }
}

impl FuseConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

// ============================================================================
// Backend and identity
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Text-completion endpoint
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Context window passed as options.num_ctx
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:11434/api/generate".to_string()
}

fn default_model() -> String {
    "warden-brain".to_string()
}

fn default_num_ctx() -> u32 {
    2048 // small context keeps memory low on constrained hosts
}

fn default_backend_timeout() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            model: default_model(),
            num_ctx: default_num_ctx(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_ai_name")]
    pub ai_name: String,

    #[serde(default = "default_developer_name")]
    pub developer_name: String,

    /// Replaces the generated system preamble when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_ai_name() -> String {
    "Warden AI".to_string()
}

fn default_developer_name() -> String {
    "the Warden team".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            ai_name: default_ai_name(),
            developer_name: default_developer_name(),
            system_prompt: None,
        }
    }
}

impl IdentityConfig {
    /// System preamble injected ahead of every forwarded prompt
    pub fn system_prompt(&self) -> String {
        if let Some(custom) = &self.system_prompt {
            return custom.clone();
        }
        format!(
            "You are {name}, a prototype AI developed by {dev}.\n\
             You were built from scratch by {dev}.\n\
             Do NOT mention internal codenames or the software you run on.\n\
             If asked about your creation, credit {dev}.",
            name = self.ai_name,
            dev = self.developer_name,
        )
    }
}

// ============================================================================
// Firewall and executors
// ============================================================================

/// Extra trigger phrases appended to the built-in rule table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallConfig {
    #[serde(default)]
    pub extra_creator_triggers: Vec<String>,

    #[serde(default)]
    pub extra_blocklist: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorsConfig {
    #[serde(default)]
    pub image: Option<ExecutorConfig>,

    #[serde(default)]
    pub code: Option<ExecutorConfig>,
}

/// External program run for a long task; the prompt is passed as last argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub program: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,
}

// ============================================================================
// Loading
// ============================================================================

impl WardenConfig {
    /// Load config from an explicit path, or the standard locations
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load_first_found(&[
                Path::new(CONFIG_PATH),
                Path::new(DEFAULT_CONFIG_PATH),
            ])?,
        };

        config.validate()?;

        if config.auth.access_code == PLACEHOLDER_ACCESS_CODE {
            warn!("Using the placeholder access code; set auth.access_code before exposing the server");
        }

        Ok(config)
    }

    /// Load the first candidate that exists, or defaults if none do.
    /// Only a missing file falls through; unreadable or malformed files are errors.
    pub fn load_first_found(candidates: &[&Path]) -> Result<Self, ConfigError> {
        for path in candidates {
            match Self::load_from_path(path) {
                Ok(config) => return Ok(config),
                Err(ConfigError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                    continue
                }
                Err(e) => return Err(e),
            }
        }

        warn!("No config file found, using defaults");
        Ok(WardenConfig::default())
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject values the gateway cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_code.trim().is_empty() {
            return Err(ConfigError::invalid("auth.access_code", "must not be empty"));
        }
        if self.auth.session_cookie_name.is_empty()
            || !self
                .auth
                .session_cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::invalid(
                "auth.session_cookie_name",
                "must be non-empty ASCII alphanumerics, '_' or '-'",
            ));
        }
        if self.quota.max_prompts_per_client == 0 {
            return Err(ConfigError::invalid("quota.max_prompts_per_client", "must be at least 1"));
        }
        check_percent("fuse.cpu_limit_percent", self.fuse.cpu_limit_percent)?;
        check_percent("fuse.ram_limit_percent", self.fuse.ram_limit_percent)?;
        if self.fuse.check_interval_secs == 0 {
            return Err(ConfigError::invalid("fuse.check_interval_secs", "must be at least 1"));
        }
        if self.fuse.cpu_strike_threshold == 0 {
            return Err(ConfigError::invalid("fuse.cpu_strike_threshold", "must be at least 1"));
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::invalid("backend.timeout_secs", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_percent(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} is not in (0, 100]", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.quota.max_prompts_per_client, 50);
        assert_eq!(config.fuse.cpu_limit_percent, 98.0);
        assert_eq!(config.fuse.ram_limit_percent, 96.0);
        assert_eq!(config.fuse.check_interval(), Duration::from_secs(2));
        assert_eq!(config.fuse.cpu_strike_threshold, 5);
        assert_eq!(config.backend.timeout(), Duration::from_secs(60));
        assert_eq!(config.backend.num_ctx, 2048);
        assert!(config.executors.image.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[auth]
access_code = "letmein"

[fuse]
cpu_limit_percent = 90.0
grace_period_secs = 0

[executors.image]
program = "/usr/local/bin/imagine"
args = ["--steps", "20"]
"#;
        let config = WardenConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.auth.access_code, "letmein");
        assert_eq!(config.auth.session_cookie_name, "warden_session");
        assert_eq!(config.fuse.cpu_limit_percent, 90.0);
        assert_eq!(config.fuse.grace_period(), Duration::ZERO);
        // Defaults for missing fields
        assert_eq!(config.fuse.ram_limit_percent, 96.0);
        assert_eq!(config.quota.max_prompts_per_client, 50);

        let image = config.executors.image.unwrap();
        assert_eq!(image.program, PathBuf::from("/usr/local/bin/imagine"));
        assert_eq!(image.args, vec!["--steps", "20"]);
        assert!(config.executors.code.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = WardenConfig::default();
        config.fuse.ram_limit_percent = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "fuse.ram_limit_percent", .. })
        ));

        let mut config = WardenConfig::default();
        config.fuse.cpu_strike_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.auth.session_cookie_name = "bad name;".to_string();
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.auth.access_code = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_system_prompt_uses_identity() {
        let identity = IdentityConfig {
            ai_name: "Nova".to_string(),
            developer_name: "Ada".to_string(),
            system_prompt: None,
        };
        let prompt = identity.system_prompt();
        assert!(prompt.starts_with("You are Nova, a prototype AI developed by Ada."));

        let custom = IdentityConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..identity
        };
        assert_eq!(custom.system_prompt(), "Be brief.");
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[quota]\nmax_prompts_per_client = 3\n").unwrap();

        let config = WardenConfig::load(Some(&path)).unwrap();
        assert_eq!(config.quota.max_prompts_per_client, 3);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            WardenConfig::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));

        fs::write(&path, "[quota\n").unwrap();
        assert!(matches!(
            WardenConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_malformed_config_is_not_replaced_by_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let primary = dir.path().join("primary.toml");
        let fallback = dir.path().join("fallback.toml");
        fs::write(&primary, "[auth]\naccess_code = \"oops\n").unwrap();
        fs::write(&fallback, "[quota]\nmax_prompts_per_client = 7\n").unwrap();

        let err = WardenConfig::load_first_found(&[primary.as_path(), fallback.as_path()]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path.ends_with("primary.toml")));
    }

    #[test]
    fn test_missing_config_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let fallback = dir.path().join("fallback.toml");
        fs::write(&fallback, "[quota]\nmax_prompts_per_client = 7\n").unwrap();

        let config = WardenConfig::load_first_found(&[missing.as_path(), fallback.as_path()]).unwrap();
        assert_eq!(config.quota.max_prompts_per_client, 7);

        let config = WardenConfig::load_first_found(&[missing.as_path()]).unwrap();
        assert_eq!(config.auth.access_code, PLACEHOLDER_ACCESS_CODE);
    }
}
