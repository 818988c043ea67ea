//! Auditable job reports.
//!
//! A [`JobReport`] captures the timeline and outcome of one job, including
//! the diagnostics of the last failing run. Reports can be persisted as
//! `<dir>/<job_id>/job.json` next to a SHA-256 `job.digest` and read back with
//! integrity verification.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{
    CandidateCode, JobOutcome, LegacyCode, RefactorError, RefactorJob, Result, StageRecord,
    TestArtifact,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub legacy_code: LegacyCode,
    pub tests: Option<TestArtifact>,
    /// Candidate held when the job ended; on retry-budget failure this is the
    /// last, untested repair.
    pub last_candidate: Option<CandidateCode>,
    pub attempts_used: u32,
    pub max_retries: u32,
    pub timeline: Vec<StageRecord>,
    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn from_job(job: &RefactorJob, max_retries: u32, outcome: JobOutcome) -> Self {
        Self {
            job_id: job.id,
            legacy_code: job.legacy().clone(),
            tests: job.tests().cloned(),
            last_candidate: job.candidate().cloned(),
            attempts_used: job.attempts(),
            max_retries,
            timeline: job.timeline().to_vec(),
            outcome,
            started_at: job.started_at(),
            finished_at: Utc::now(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Persist `<dir>/<job_id>/job.json` and `<dir>/<job_id>/job.digest`.
pub fn write_job_artifact(report: &JobReport, dir: &Path) -> Result<PathBuf> {
    let job_dir = dir.join(report.job_id.to_string());
    std::fs::create_dir_all(&job_dir)?;

    let artifact_path = job_dir.join("job.json");
    let digest_path = job_dir.join("job.digest");
    let json = serde_json::to_vec_pretty(report)?;

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(&digest_path, content_digest(&json).as_bytes())?;

    Ok(artifact_path)
}

/// Read `<dir>/<job_id>/job.json`, verifying it against its digest.
pub fn read_job_artifact(job_id: &str, dir: &Path) -> Result<JobReport> {
    let job_dir = dir.join(job_id);
    let json = std::fs::read(job_dir.join("job.json"))?;
    let expected = std::fs::read_to_string(job_dir.join("job.digest"))?;
    let actual = content_digest(&json);
    if expected.trim() != actual {
        return Err(RefactorError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}
