//! Actix-web routes for the refactoring daemon

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::debug;

use refactor_core::{handle_submission, Orchestrator, RefactorRequest};

/// Registers the daemon's routes on an `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/health", web::get().to(health))
        .route("/api/refactor", web::post().to(refactor));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": refactor_core::VERSION,
    }))
}

/// Runs one refactor job per request and maps its outcome onto the status code
async fn refactor(
    orchestrator: web::Data<Orchestrator>,
    body: web::Json<RefactorRequest>,
) -> HttpResponse {
    let response = handle_submission(&orchestrator, body.into_inner()).await;
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    debug!(status = status.as_u16(), "refactor request handled");
    HttpResponse::build(status).json(response.body)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = serde_json::json!({ "error": format!("Invalid request body: {err}") });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}
