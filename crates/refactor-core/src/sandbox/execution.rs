//! Test execution in disposable workspaces.

use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::domain::{ModuleIdentity, TestArtifact};

use super::error::{ExecutorError, ExecutorResult};

/// Outcome of running a regression suite against one code artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub passed: bool,
    /// Combined stdout and stderr of the test runner.
    pub diagnostics: String,
}

impl ExecutionResult {
    pub fn passed(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: true,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostics: diagnostics.into(),
        }
    }

    /// Node ids of failing or erroring tests reported by pytest.
    pub fn failing_tests(&self) -> Vec<String> {
        static FAILED: OnceLock<Regex> = OnceLock::new();
        let re = FAILED.get_or_init(|| {
            Regex::new(r"(?m)^(?:FAILED|ERROR) (\S+)").expect("static regex is valid")
        });
        re.captures_iter(&self.diagnostics)
            .map(|c| c[1].to_string())
            .collect()
    }
}

/// Runs a test artifact against code in an isolated, ephemeral workspace.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// The module identity generated tests must import from.
    fn module(&self) -> &ModuleIdentity;

    /// Materialize `code` and `tests`, run the suite and report the outcome.
    ///
    /// A failing suite is `Ok` with `passed == false`; `Err` is reserved for
    /// the executor itself breaking down.
    async fn run(&self, code: &str, tests: &TestArtifact) -> ExecutorResult<ExecutionResult>;
}

/// Configuration for the pytest-backed executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interpreter or runner binary.
    pub program: String,
    /// Arguments placed before the test file path.
    pub args: Vec<String>,
    /// Per-run wall-clock limit in seconds (0 = unlimited).
    pub timeout_secs: u64,
    pub module: ModuleIdentity,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec![
                "-m".to_string(),
                "pytest".to_string(),
                "-q".to_string(),
                "-p".to_string(),
                "no:cacheprovider".to_string(),
            ],
            timeout_secs: 0,
            module: ModuleIdentity::default(),
        }
    }
}

/// Executor that writes code and tests into a fresh temporary directory and
/// runs pytest there. The directory is removed when the call returns, on
/// every path.
#[derive(Debug, Clone, Default)]
pub struct PytestExecutor {
    config: ExecutorConfig,
}

impl PytestExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}

#[async_trait]
impl TestExecutor for PytestExecutor {
    fn module(&self) -> &ModuleIdentity {
        &self.config.module
    }

    async fn run(&self, code: &str, tests: &TestArtifact) -> ExecutorResult<ExecutionResult> {
        let start = Instant::now();
        let module = &self.config.module;

        let workspace = tempfile::Builder::new()
            .prefix("refactor-run-")
            .tempdir()
            .map_err(ExecutorError::Workspace)?;

        tokio::fs::write(workspace.path().join(module.source_file()), code)
            .await
            .map_err(ExecutorError::Workspace)?;
        let test_path = workspace.path().join(&module.test_file);
        tokio::fs::write(&test_path, module.wrap_tests(tests))
            .await
            .map_err(ExecutorError::Workspace)?;

        let child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(&test_path)
            .current_dir(workspace.path())
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutorError::Spawn {
                program: self.config.program.clone(),
                reason: e.to_string(),
            })?;

        let output = if self.config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| ExecutorError::Timeout {
                limit_secs: self.config.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = stdout.into_owned();
        diagnostics.push_str(&stderr);

        debug!(
            workspace = %workspace.path().display(),
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis() as u64,
            "test run finished"
        );

        Ok(ExecutionResult {
            passed: output.status.success(),
            diagnostics,
        })
    }
}
