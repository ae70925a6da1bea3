// HTTP route handlers for the Grader API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use grader_common::types::{Submission, Verdict};
use grader_engine::GradeError;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::AppState;

/// Map a verdict to the response status: graded runs that all exited
/// cleanly are 200, anything else the core reported is 422.
pub fn verdict_status(verdict: &Verdict) -> StatusCode {
    if verdict.overall_success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

pub fn error_status(error: &GradeError) -> StatusCode {
    match error {
        GradeError::Validation(_) => StatusCode::BAD_REQUEST,
        GradeError::Transport(_) | GradeError::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /compile - Compile and grade a submission
pub async fn compile_submission(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<Submission>,
) -> Response {
    info!(
        source_size = submission.code.len(),
        visible_tests = submission.test_data.as_ref().map_or(1, Vec::len),
        hidden_tests = submission.hidden_test_data.as_ref().map_or(0, Vec::len),
        "Submission received"
    );

    match state.engine.process_submission(&submission).await {
        Ok(verdict) => {
            let status = verdict_status(&verdict);
            info!(overall_success = verdict.overall_success, "Verdict returned");
            (status, Json(verdict)).into_response()
        }
        Err(e) => {
            let status = error_status(&e);
            if status == StatusCode::BAD_REQUEST {
                warn!(error = %e, "Rejected submission");
            } else {
                error!(error = %e, "Failed to process submission");
            }
            (
                status,
                Json(serde_json::json!({
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
