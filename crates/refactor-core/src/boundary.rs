//! Request boundary: maps a code submission to a job and the job's outcome
//! to a transport-neutral response.

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::JobOutcome;
use crate::orchestrator::Orchestrator;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

const FAILURE_MESSAGE: &str = "Could not safely refactor code.";

/// Incoming submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorRequest {
    #[serde(default)]
    pub code: Option<String>,
}

impl RefactorRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }
}

/// Response body variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Refactored {
        status: String,
        original_code: String,
        refactored_code: String,
    },
    Failed {
        status: String,
        message: String,
        reason: String,
    },
    Rejected {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl BoundaryResponse {
    fn rejected() -> Self {
        Self {
            status_code: STATUS_BAD_REQUEST,
            body: ResponseBody::Rejected {
                error: "No code provided".to_string(),
            },
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            status_code: STATUS_INTERNAL_ERROR,
            body: ResponseBody::Failed {
                status: "failed".to_string(),
                message: FAILURE_MESSAGE.to_string(),
                reason: reason.into(),
            },
        }
    }
}

/// Validate the submission, run the job and map its outcome.
///
/// Blank submissions are rejected without touching the orchestrator.
/// Controlled failures and collaborator errors both surface as a server
/// error with a short reason; full diagnostics only go to the logs.
pub async fn handle_submission(
    orchestrator: &Orchestrator,
    request: RefactorRequest,
) -> BoundaryResponse {
    let code = match request.code {
        Some(code) if !code.trim().is_empty() => code,
        _ => return BoundaryResponse::rejected(),
    };

    match orchestrator.process(&code).await {
        Ok(JobOutcome::Success { final_code }) => BoundaryResponse {
            status_code: STATUS_OK,
            body: ResponseBody::Refactored {
                status: "success".to_string(),
                original_code: code,
                refactored_code: final_code.into_inner(),
            },
        },
        Ok(JobOutcome::Failed {
            reason,
            diagnostics,
        }) => {
            warn!(reason = %reason, diagnostics = %diagnostics, "refactor job failed");
            BoundaryResponse::failed(reason.message())
        }
        Err(err) => {
            error!(error = %err, "refactor job errored");
            BoundaryResponse::failed("collaborator failure")
        }
    }
}
