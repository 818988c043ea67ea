//! The refactor job: the unit of work driven by the orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::{CandidateCode, LegacyCode, TestArtifact};

/// Stages of the verify / refactor / heal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    GenerateTests,
    ValidateAgainstLegacy,
    Refactor,
    Heal,
    Finished,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStage::GenerateTests => "generate_tests",
            JobStage::ValidateAgainstLegacy => "validate_against_legacy",
            JobStage::Refactor => "refactor",
            JobStage::Heal => "heal",
            JobStage::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Why a job ended without a verified candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    #[serde(rename = "generated tests invalid against legacy baseline")]
    BaselineTestFailure,
    #[serde(rename = "exceeded retry budget")]
    RetryBudgetExhausted,
}

impl FailureReason {
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::BaselineTestFailure => "generated tests invalid against legacy baseline",
            FailureReason::RetryBudgetExhausted => "exceeded retry budget",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success {
        #[serde(rename = "finalCode")]
        final_code: CandidateCode,
    },
    Failed {
        reason: FailureReason,
        /// Diagnostics of the last failing test run.
        diagnostics: String,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn final_code(&self) -> Option<&CandidateCode> {
        match self {
            JobOutcome::Success { final_code } => Some(final_code),
            JobOutcome::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failed { reason, .. } => Some(*reason),
        }
    }
}

/// One entry in the job timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: JobStage,
    /// Heal attempt number (1-based); `None` outside the heal loop.
    pub attempt: Option<u32>,
    /// Test outcome for stages that ran the suite.
    pub passed: Option<bool>,
    pub at: DateTime<Utc>,
}

/// A single refactor job.
///
/// Owns the legacy code, the regression suite once generated, the current
/// candidate and the heal attempt counter. The suite is set at most once.
#[derive(Debug, Clone)]
pub struct RefactorJob {
    pub id: Uuid,
    legacy: LegacyCode,
    tests: Option<TestArtifact>,
    candidate: Option<CandidateCode>,
    stage: JobStage,
    attempts: u32,
    last_diagnostics: Option<String>,
    timeline: Vec<StageRecord>,
    started_at: DateTime<Utc>,
}

impl RefactorJob {
    pub fn new(legacy: LegacyCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            legacy,
            tests: None,
            candidate: None,
            stage: JobStage::GenerateTests,
            attempts: 0,
            last_diagnostics: None,
            timeline: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn legacy(&self) -> &LegacyCode {
        &self.legacy
    }

    pub fn tests(&self) -> Option<&TestArtifact> {
        self.tests.as_ref()
    }

    pub fn candidate(&self) -> Option<&CandidateCode> {
        self.candidate.as_ref()
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_diagnostics(&self) -> Option<&str> {
        self.last_diagnostics.as_deref()
    }

    pub fn timeline(&self) -> &[StageRecord] {
        &self.timeline
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Store the generated suite. The suite is immutable for the rest of the job.
    pub fn set_tests(&mut self, tests: TestArtifact) {
        debug_assert!(self.tests.is_none(), "regression suite is generated once per job");
        self.tests.get_or_insert(tests);
        self.record(JobStage::GenerateTests, None, None);
        self.stage = JobStage::ValidateAgainstLegacy;
    }

    /// Record the baseline check result.
    pub fn record_baseline(&mut self, passed: bool, diagnostics: &str) {
        self.record(JobStage::ValidateAgainstLegacy, None, Some(passed));
        if passed {
            self.stage = JobStage::Refactor;
        } else {
            self.last_diagnostics = Some(diagnostics.to_string());
        }
    }

    /// Replace the candidate with the first refactor.
    pub fn set_refactored(&mut self, candidate: CandidateCode) {
        self.candidate = Some(candidate);
        self.record(JobStage::Refactor, None, None);
        self.stage = JobStage::Heal;
    }

    /// Begin the next heal attempt; returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Record the verification result of the current heal attempt.
    pub fn record_attempt(&mut self, passed: bool, diagnostics: &str) {
        self.record(JobStage::Heal, Some(self.attempts), Some(passed));
        if !passed {
            // Only the most recent failure is retained.
            self.last_diagnostics = Some(diagnostics.to_string());
        }
    }

    /// Replace the candidate wholesale with a repaired one.
    pub fn replace_candidate(&mut self, candidate: CandidateCode) {
        self.candidate = Some(candidate);
    }

    /// Mark the job finished and return the stage it ended in.
    pub fn finish(&mut self) -> JobStage {
        std::mem::replace(&mut self.stage, JobStage::Finished)
    }

    fn record(&mut self, stage: JobStage, attempt: Option<u32>, passed: Option<bool>) {
        self.timeline.push(StageRecord {
            stage,
            attempt,
            passed,
            at: Utc::now(),
        });
    }
}
