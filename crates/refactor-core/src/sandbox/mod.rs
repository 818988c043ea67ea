//! Sandbox: isolated execution of a regression suite against code.
//!
//! Each run materializes the code under a fixed [`ModuleIdentity`] inside a
//! fresh temporary directory, injects the import preamble ahead of the test
//! body and runs the test runner there. Nothing survives the call.
//!
//! # Modules
//!
//! - [`execution`]: `TestExecutor` trait, `ExecutionResult`, `PytestExecutor`
//! - [`error`]: `ExecutorError` / `ExecutorResult`
//!
//! [`ModuleIdentity`]: crate::domain::ModuleIdentity

pub mod error;
pub mod execution;

pub use error::{ExecutorError, ExecutorResult};
pub use execution::{ExecutionResult, ExecutorConfig, PytestExecutor, TestExecutor};
