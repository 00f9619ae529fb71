//! Long-running task executors (image and code generation).
//!
//! Executors are opaque blocking programs. The pipeline runs them on the
//! blocking thread pool so a slow generation never stalls request handling.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use warden_common::{ExecutorConfig, ExecutorsConfig};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} produced no output")]
    EmptyOutput { program: String },

    #[error("executor task aborted: {0}")]
    Join(String),
}

/// A blocking task runner
pub trait TaskExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Run one task to completion and return its textual result
    fn run(&self, input: &str) -> Result<String, ExecutorError>;
}

/// Runs a configured program with the task as its final argument.
/// The trimmed stdout is the result.
pub struct ProcessExecutor {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessExecutor {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    pub fn from_config(name: &str, config: &ExecutorConfig) -> Self {
        Self::new(name, config.program.clone(), config.args.clone())
    }
}

impl TaskExecutor for ProcessExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, input: &str) -> Result<String, ExecutorError> {
        let program = self.program.display().to_string();
        info!("[{}] running {}", self.name, program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .output()
            .map_err(|source| ExecutorError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("[{}] {} failed: {}", self.name, program, stderr);
            return Err(ExecutorError::Failed {
                program,
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(ExecutorError::EmptyOutput { program });
        }
        Ok(stdout)
    }
}

/// Executors available to the pipeline; `None` means not installed
#[derive(Clone, Default)]
pub struct Executors {
    pub image: Option<Arc<dyn TaskExecutor>>,
    pub code: Option<Arc<dyn TaskExecutor>>,
}

impl Executors {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExecutorsConfig) -> Self {
        let build = |name: &str, cfg: &Option<ExecutorConfig>| {
            cfg.as_ref().map(|c| {
                info!("[BOOT] {} executor: {}", name, c.program.display());
                Arc::new(ProcessExecutor::from_config(name, c)) as Arc<dyn TaskExecutor>
            })
        };

        Self {
            image: build("image", &config.image),
            code: build("code", &config.code),
        }
    }
}

/// Run an executor on the blocking pool
pub async fn run_blocking(
    executor: Arc<dyn TaskExecutor>,
    input: String,
) -> Result<String, ExecutorError> {
    tokio::task::spawn_blocking(move || executor.run(&input))
        .await
        .map_err(|e| ExecutorError::Join(e.to_string()))?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_process_executor_returns_stdout() {
        let exec = ProcessExecutor::new("echo", "echo", vec!["result:".to_string()]);
        assert_eq!(exec.run("a cat").unwrap(), "result: a cat");
        assert_eq!(exec.name(), "echo");
    }

    #[test]
    fn test_process_executor_missing_program() {
        let exec = ProcessExecutor::new("ghost", "/nonexistent/warden-executor", vec![]);
        assert!(matches!(exec.run("x"), Err(ExecutorError::Spawn { .. })));
    }

    #[test]
    fn test_process_executor_nonzero_exit() {
        let exec = ProcessExecutor::new("sh", "sh", vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        match exec.run("ignored") {
            Err(ExecutorError::Failed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_process_executor_empty_output() {
        let exec = ProcessExecutor::new("true", "true", vec![]);
        assert!(matches!(exec.run("x"), Err(ExecutorError::EmptyOutput { .. })));
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let exec: Arc<dyn TaskExecutor> = Arc::new(ProcessExecutor::new("echo", "echo", vec![]));
        assert_eq!(run_blocking(exec, "hi".to_string()).await.unwrap(), "hi");
    }

    #[test]
    fn test_executors_from_config() {
        let config = ExecutorsConfig {
            image: Some(ExecutorConfig {
                program: PathBuf::from("/opt/imagine"),
                args: vec![],
            }),
            code: None,
        };
        let executors = Executors::from_config(&config);
        assert_eq!(executors.image.unwrap().name(), "image");
        assert!(executors.code.is_none());
    }
}
