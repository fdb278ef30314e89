use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CandidateId, FlagId};
use super::intake::IntakeViolation;
use super::repository::{FlagReview, SnapshotSink};
use super::service::{FlaggingService, FlaggingServiceError, DEFAULT_PAGE_SIZE};

/// Router builder exposing evaluation, listing, and flag review endpoints.
pub fn candidate_router<S>(service: Arc<FlaggingService<S>>) -> Router
where
    S: SnapshotSink,
{
    Router::new()
        .route("/api/candidates/evaluate", post(evaluate_handler::<S>))
        .route("/api/candidates", get(list_handler::<S>))
        .route("/api/candidates/stored", get(stored_handler::<S>))
        .route("/api/candidates/:candidate_id", get(detail_handler::<S>))
        .route(
            "/api/candidates/:candidate_id/flags/:flag_id",
            patch(update_flag_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    pub(crate) page: Option<usize>,
    #[serde(rename = "pageSize")]
    pub(crate) page_size: Option<usize>,
}

pub(crate) async fn evaluate_handler<S>(
    State(service): State<Arc<FlaggingService<S>>>,
    axum::Json(payload): axum::Json<serde_json::Value>,
) -> Response
where
    S: SnapshotSink,
{
    match service.submit(payload).await {
        Ok((candidate_id, evaluation)) => {
            let payload = json!({
                "success": true,
                "data": {
                    "isEligible": evaluation.is_eligible,
                    "flags": evaluation.flags,
                    "candidateId": candidate_id,
                },
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(FlaggingServiceError::Intake(violation)) => intake_rejection(violation),
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<FlaggingService<S>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: SnapshotSink,
{
    if query.page.is_none() && query.page_size.is_none() {
        return all_candidates(&service);
    }

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    match service.list_page(page, page_size) {
        Ok(page) => {
            let payload = json!({ "success": true, "data": page });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn stored_handler<S>(State(service): State<Arc<FlaggingService<S>>>) -> Response
where
    S: SnapshotSink,
{
    all_candidates(&service)
}

fn all_candidates<S: SnapshotSink>(service: &FlaggingService<S>) -> Response {
    match service.list_all() {
        Ok(candidates) => {
            let payload = json!({ "success": true, "data": candidates });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<FlaggingService<S>>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    S: SnapshotSink,
{
    match service.get(&CandidateId(candidate_id)) {
        Ok(Some(record)) => {
            let payload = json!({ "success": true, "data": record });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(None) => not_found("Candidate not found"),
        Err(err) => internal_error(err),
    }
}

pub(crate) async fn update_flag_handler<S>(
    State(service): State<Arc<FlaggingService<S>>>,
    Path((candidate_id, flag_id)): Path<(String, String)>,
    axum::Json(review): axum::Json<FlagReview>,
) -> Response
where
    S: SnapshotSink,
{
    let candidate_id = CandidateId(candidate_id);
    let flag_id = FlagId(flag_id);
    match service.update_flag(&candidate_id, &flag_id, review).await {
        Ok(Some(evaluation)) => {
            let payload = json!({
                "success": true,
                "message": "Flag status updated successfully",
                "data": evaluation,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(None) => not_found("Candidate or flag not found"),
        Err(err) => internal_error(err),
    }
}

fn intake_rejection(violation: IntakeViolation) -> Response {
    let status = match violation {
        IntakeViolation::EmptySubmission | IntakeViolation::MissingFields(_) => {
            StatusCode::BAD_REQUEST
        }
        IntakeViolation::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let mut payload = json!({
        "success": false,
        "message": violation.to_string(),
    });
    if let IntakeViolation::MissingFields(fields) = &violation {
        payload["missingFields"] = json!(fields);
    }
    (status, axum::Json(payload)).into_response()
}

fn not_found(message: &str) -> Response {
    let payload = json!({ "success": false, "message": message });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    tracing::error!(%err, "candidate request failed");
    let payload = json!({
        "success": false,
        "message": "Internal server error",
        "error": err.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
