//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wardend::backend::{BackendError, TextBackend};
use wardend::executor::{ExecutorError, Executors, TaskExecutor};
use wardend::firewall::ContentFirewall;
use wardend::fuse::{FuseLimits, ResourceFuse};
use wardend::pipeline::AdmissionPipeline;
use wardend::quota::QuotaTracker;
use wardend::session::SessionStore;

pub const ACCESS_CODE: &str = "s3cret-code";
pub const SYSTEM_PROMPT: &str = "You are a test assistant.";

/// Backend that echoes the user's line and records every full prompt
#[derive(Default)]
pub struct EchoBackend {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl EchoBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextBackend for EchoBackend {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let user_line = prompt
            .lines()
            .find_map(|l| l.strip_prefix("User: "))
            .unwrap_or_default();
        Ok(format!("echo: {}", user_line))
    }
}

/// Backend that is never reachable
pub struct DownBackend;

#[async_trait]
impl TextBackend for DownBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
        Err(BackendError::Connection("connection refused".to_string()))
    }
}

/// Executor that always returns the same output
pub struct FixedExecutor(pub String);

impl TaskExecutor for FixedExecutor {
    fn name(&self) -> &str {
        "fixed"
    }

    fn run(&self, _input: &str) -> Result<String, ExecutorError> {
        Ok(self.0.clone())
    }
}

pub struct FailingExecutor;

impl TaskExecutor for FailingExecutor {
    fn name(&self) -> &str {
        "failing"
    }

    fn run(&self, _input: &str) -> Result<String, ExecutorError> {
        Err(ExecutorError::Failed {
            program: "gen".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "out of VRAM".to_string(),
        })
    }
}

pub struct PanickingExecutor;

impl TaskExecutor for PanickingExecutor {
    fn name(&self) -> &str {
        "panicking"
    }

    fn run(&self, _input: &str) -> Result<String, ExecutorError> {
        panic!("executor crashed");
    }
}

pub fn fixed(output: &str) -> Arc<dyn TaskExecutor> {
    Arc::new(FixedExecutor(output.to_string()))
}

/// A pipeline with handles on every component it owns
pub struct Harness {
    pub fuse: Arc<ResourceFuse>,
    pub sessions: Arc<SessionStore>,
    pub quota: Arc<QuotaTracker>,
    pub pipeline: AdmissionPipeline,
}

impl Harness {
    pub fn new(backend: Arc<dyn TextBackend>, executors: Executors) -> Self {
        Self::with_ceiling(backend, executors, 50)
    }

    pub fn with_ceiling(backend: Arc<dyn TextBackend>, executors: Executors, ceiling: u32) -> Self {
        let fuse = Arc::new(ResourceFuse::new(FuseLimits::default()));
        let sessions = Arc::new(SessionStore::new());
        let quota = Arc::new(QuotaTracker::new(ceiling));
        let pipeline = AdmissionPipeline::new(
            Arc::clone(&fuse),
            Arc::clone(&sessions),
            Arc::clone(&quota),
            ContentFirewall::default(),
            backend,
            executors,
            SYSTEM_PROMPT,
        );
        Self {
            fuse,
            sessions,
            quota,
            pipeline,
        }
    }

    pub async fn login(&self) -> String {
        self.sessions
            .login(ACCESS_CODE, ACCESS_CODE)
            .await
            .expect("login with the right code")
    }
}
