//! Structured progress notifications for refactor jobs.
//!
//! Every stage transition of the orchestrator is emitted here at `info!`
//! level inside a job-scoped span; failing diagnostics go out at `warn!`.
//! None of this is part of the job's return contract.

use tracing::{info, warn};

use crate::domain::{FailureReason, JobStage};

/// Span that scopes every event of one job.
///
/// ```ignore
/// orchestrator.drive(&mut job).instrument(job_span(&job_id)).await
/// // every event inside carries job_id
/// ```
pub fn job_span(job_id: &str) -> tracing::Span {
    tracing::info_span!("refactor.job", job_id = %job_id)
}

pub fn emit_job_started(job_id: &str, legacy_bytes: usize) {
    info!(
        event = "job.started",
        job_id = %job_id,
        legacy_bytes = legacy_bytes,
        "generating regression tests"
    );
}

pub fn emit_tests_generated(job_id: &str, test_bytes: usize) {
    info!(event = "job.tests_generated", job_id = %job_id, test_bytes = test_bytes);
}

pub fn emit_baseline_checked(job_id: &str, passed: bool, diagnostics: &str) {
    if passed {
        info!(
            event = "job.baseline_checked",
            job_id = %job_id,
            passed = true,
            "tests verified against legacy code"
        );
    } else {
        warn!(
            event = "job.baseline_checked",
            job_id = %job_id,
            passed = false,
            diagnostics = %diagnostics,
            "generated tests fail on the legacy code; aborting"
        );
    }
}

pub fn emit_refactored(job_id: &str, candidate_bytes: usize) {
    info!(event = "job.refactored", job_id = %job_id, candidate_bytes = candidate_bytes);
}

pub fn emit_heal_attempt(
    job_id: &str,
    attempt: u32,
    max_retries: u32,
    passed: bool,
    failing: &[String],
) {
    if passed {
        info!(event = "job.heal_attempt", job_id = %job_id, attempt, max_retries, passed = true);
    } else {
        warn!(
            event = "job.heal_attempt",
            job_id = %job_id,
            attempt,
            max_retries,
            passed = false,
            failing = ?failing,
            "candidate failed regression suite; healing"
        );
    }
}

pub fn emit_job_finished(
    job_id: &str,
    ended_in: JobStage,
    attempts: u32,
    failure: Option<FailureReason>,
    duration_ms: u64,
) {
    match failure {
        None => info!(
            event = "job.finished",
            job_id = %job_id,
            ended_in = %ended_in,
            attempts,
            duration_ms,
            success = true,
        ),
        Some(reason) => warn!(
            event = "job.finished",
            job_id = %job_id,
            ended_in = %ended_in,
            attempts,
            duration_ms,
            success = false,
            reason = %reason,
        ),
    }
}
