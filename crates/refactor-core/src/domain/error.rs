//! Error taxonomy for refactor jobs.
//!
//! Controlled job failures (baseline rejected, retry budget exhausted) are not
//! errors; they are reported through [`crate::domain::JobOutcome`]. Everything
//! in here is a collaborator or infrastructure failure that ends the job.

use crate::sandbox::ExecutorError;

/// Errors produced while rendering an instruction template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template {template} is missing field: {field}")]
    MissingField { template: String, field: String },

    #[error("template {template} does not accept field: {field}")]
    UnexpectedField { template: String, field: String },
}

/// Errors produced by a code transformer.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("transformer API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transformer returned no content")]
    EmptyResponse,

    #[error("malformed transformer response: {0}")]
    Malformed(String),
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal errors for a refactor job.
#[derive(Debug, thiserror::Error)]
pub enum RefactorError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("transformer error: {0}")]
    Transform(#[from] TransformError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for refactor operations.
pub type Result<T> = std::result::Result<T, RefactorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::MissingField {
            template: "fix".to_string(),
            field: "error_message".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fix"));
        assert!(msg.contains("error_message"));
    }

    #[test]
    fn test_transform_error_wraps_into_refactor_error() {
        let err: RefactorError = TransformError::Api {
            status: 503,
            body: "upstream unavailable".to_string(),
        }
        .into();
        assert!(err.to_string().contains("transformer error"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = RefactorError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
