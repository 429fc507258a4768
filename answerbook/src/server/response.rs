use answerbook_core::{Failure, FailureKind, Outcome, UpsertError};
use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upsert(#[from] UpsertError),

    #[error("Malformed form data: {0}")]
    Form(#[from] MultipartError),

    #[error("Expected multipart/form-data: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Upsert task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::MissingField => StatusCode::BAD_REQUEST,
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::DocumentConflict => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": .., "kind": .., "details"?: ..}`
pub fn failure_body(failure: &Failure) -> Value {
    let mut body = json!({
        "error": failure.message,
        "kind": failure.kind,
    });
    if let Some(details) = &failure.details {
        body["details"] = details.clone();
    }
    body
}

/// `{"success": true}`, or the failure body under its status.
pub fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Success => Json(json!({ "success": true })).into_response(),
        Outcome::Failure(failure) => (status_for(failure.kind), Json(failure_body(&failure))).into_response(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Upsert(e) => outcome_response(Outcome::Failure(e.to_failure())),
            // 400, or 413 when the body limit was hit.
            ApiError::Form(e) => {
                (e.status(), Json(json!({ "error": format!("Malformed form data: {}", e.body_text()) })))
                    .into_response()
            }
            ApiError::NotMultipart(e) => (e.status(), Json(json!({ "error": e.body_text() }))).into_response(),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "error": "Method not allowed" }))).into_response()
            }
            ApiError::Task(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": format!("Upsert task failed: {}", e) })))
                    .into_response()
            }
        }
    }
}
