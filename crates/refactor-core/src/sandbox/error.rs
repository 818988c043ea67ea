//! Error types for the sandboxed test executor.

/// Errors produced by the executor itself, as opposed to failing tests.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to prepare execution workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to launch test runner {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("test run timed out after {limit_secs}s")]
    Timeout { limit_secs: u64 },

    #[error("io error while running tests: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for executor operations.
pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
