//! The verify / refactor / heal state machine.
//!
//! ```text
//! GenerateTests -> ValidateAgainstLegacy -> Refactor -> Heal(1..=max_retries) -> Finished
//!                        | fail                            | pass -> Success
//!                        v                                 | fail -> fix, replace candidate
//!                  Failed(baseline)              exhausted -> Failed(retry budget)
//! ```
//!
//! Only test outcomes drive branching. Transformer, executor and template
//! errors end the job immediately as `Err`.

use std::sync::Arc;

use tracing::{warn, Instrument};

use crate::domain::{
    CandidateCode, FailureReason, JobOutcome, LegacyCode, RefactorJob, Result, TestArtifact,
};
use crate::obs::{
    emit_baseline_checked, emit_heal_attempt, emit_job_finished, emit_job_started,
    emit_refactored, emit_tests_generated, job_span,
};
use crate::prompts::{TemplateRole, TemplateSet};
use crate::report::JobReport;
use crate::sandbox::TestExecutor;
use crate::transformer::CodeTransformer;

/// Heal attempts allowed after the initial refactor.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Coordinates the transformer and the executor for one job at a time.
///
/// Both collaborators are injected, so a job can run against scripted fakes
/// as easily as against a live model and a real test runner.
#[derive(Clone)]
pub struct Orchestrator {
    transformer: Arc<dyn CodeTransformer>,
    executor: Arc<dyn TestExecutor>,
    templates: TemplateSet,
    max_retries: u32,
}

impl Orchestrator {
    /// Build an orchestrator with the built-in templates for the executor's
    /// module identity and the default retry budget.
    pub fn new(transformer: Arc<dyn CodeTransformer>, executor: Arc<dyn TestExecutor>) -> Self {
        let templates = TemplateSet::for_module(executor.module());
        Self {
            transformer,
            executor,
            templates,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Run one job and return its terminal outcome.
    pub async fn process(&self, legacy_code: &str) -> Result<JobOutcome> {
        Ok(self.run_job(LegacyCode::new(legacy_code)).await?.outcome)
    }

    /// Run one job and return the full report.
    pub async fn run_job(&self, legacy: LegacyCode) -> Result<JobReport> {
        let mut job = RefactorJob::new(legacy);
        let job_id = job.id.to_string();
        let span = job_span(&job_id);

        let result = self.drive(&mut job).instrument(span.clone()).await;
        let ended_in = job.finish();

        let _entered = span.enter();
        match result {
            Ok(outcome) => {
                let report = JobReport::from_job(&job, self.max_retries, outcome);
                emit_job_finished(
                    &job_id,
                    ended_in,
                    job.attempts(),
                    report.outcome.failure_reason(),
                    report.duration_ms(),
                );
                Ok(report)
            }
            Err(err) => {
                warn!(
                    event = "job.errored",
                    job_id = %job_id,
                    attempts = job.attempts(),
                    error = %err
                );
                Err(err)
            }
        }
    }

    async fn drive(&self, job: &mut RefactorJob) -> Result<JobOutcome> {
        let job_id = job.id.to_string();
        let legacy = job.legacy().clone();
        emit_job_started(&job_id, legacy.as_str().len());

        let tests = self.generate_tests(&legacy).await?;
        emit_tests_generated(&job_id, tests.as_str().len());
        job.set_tests(tests.clone());

        let baseline = self.executor.run(legacy.as_str(), &tests).await?;
        job.record_baseline(baseline.passed, &baseline.diagnostics);
        emit_baseline_checked(&job_id, baseline.passed, &baseline.diagnostics);
        if !baseline.passed {
            return Ok(JobOutcome::Failed {
                reason: FailureReason::BaselineTestFailure,
                diagnostics: baseline.diagnostics,
            });
        }

        let mut candidate = self.refactor(&legacy).await?;
        emit_refactored(&job_id, candidate.as_str().len());
        job.set_refactored(candidate.clone());

        let mut last_diagnostics = String::new();
        while job.attempts() < self.max_retries {
            let attempt = job.begin_attempt();
            let result = self.executor.run(candidate.as_str(), &tests).await?;
            job.record_attempt(result.passed, &result.diagnostics);
            emit_heal_attempt(
                &job_id,
                attempt,
                self.max_retries,
                result.passed,
                &result.failing_tests(),
            );

            if result.passed {
                return Ok(JobOutcome::Success {
                    final_code: candidate,
                });
            }

            // The repair replaces the candidate outright; only this run's
            // diagnostics are forwarded.
            candidate = self.heal(&legacy, &candidate, &result.diagnostics).await?;
            job.replace_candidate(candidate.clone());
            last_diagnostics = result.diagnostics;
        }

        Ok(JobOutcome::Failed {
            reason: FailureReason::RetryBudgetExhausted,
            diagnostics: last_diagnostics,
        })
    }

    async fn generate_tests(&self, legacy: &LegacyCode) -> Result<TestArtifact> {
        let instruction = self
            .templates
            .render(TemplateRole::GenerateTests, &[("code", legacy.as_str())])?;
        let text = self.transformer.transform(&instruction, legacy.as_str()).await?;
        Ok(TestArtifact::new(text))
    }

    async fn refactor(&self, legacy: &LegacyCode) -> Result<CandidateCode> {
        let instruction = self
            .templates
            .render(TemplateRole::Refactor, &[("code", legacy.as_str())])?;
        let text = self.transformer.transform(&instruction, legacy.as_str()).await?;
        Ok(CandidateCode::new(text))
    }

    async fn heal(
        &self,
        legacy: &LegacyCode,
        failing: &CandidateCode,
        diagnostics: &str,
    ) -> Result<CandidateCode> {
        let instruction = self.templates.render(
            TemplateRole::Fix,
            &[
                ("legacy_code", legacy.as_str()),
                ("refactored_code", failing.as_str()),
                ("error_message", diagnostics),
            ],
        )?;
        let text = self.transformer.transform(&instruction, failing.as_str()).await?;
        Ok(CandidateCode::new(text))
    }
}
