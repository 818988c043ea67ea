//! Domain model: artifacts, jobs and the error taxonomy.

pub mod artifact;
pub mod error;
pub mod job;

pub use artifact::{CandidateCode, LegacyCode, ModuleIdentity, TestArtifact};
pub use error::{ConfigError, RefactorError, Result, TemplateError, TransformError};
pub use job::{FailureReason, JobOutcome, JobStage, RefactorJob, StageRecord};
