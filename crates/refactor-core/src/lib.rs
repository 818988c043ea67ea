//! Safe Refactor Core Library
//!
//! Generates a regression suite for legacy code, confirms it against the
//! original, asks a language model for a rewrite and heals the rewrite until
//! it passes the same suite or the retry budget runs out.

pub mod boundary;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod sandbox;
pub mod telemetry;
pub mod transformer;

pub use boundary::{handle_submission, BoundaryResponse, RefactorRequest, ResponseBody};
pub use config::RefactorConfig;
pub use domain::{
    CandidateCode, ConfigError, FailureReason, JobOutcome, JobStage, LegacyCode, ModuleIdentity,
    RefactorError, RefactorJob, Result, StageRecord, TemplateError, TestArtifact, TransformError,
};
pub use orchestrator::{Orchestrator, DEFAULT_MAX_RETRIES};
pub use prompts::{PromptTemplate, TemplateRole, TemplateSet};
pub use report::{read_job_artifact, write_job_artifact, JobReport};
pub use sandbox::{
    ExecutionResult, ExecutorConfig, ExecutorError, ExecutorResult, PytestExecutor, TestExecutor,
};
pub use telemetry::init_tracing;
pub use transformer::{
    strip_code_fences, ChatCompletionsTransformer, CodeTransformer, TransformerConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
