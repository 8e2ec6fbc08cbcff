//! Public complaint endpoints: submission, tracking and the transparency ledger

use crate::ledger::{ledger_view, LedgerView};
use crate::models::*;
use crate::pipeline::PipelineError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{load_complaint, AppState};

// =============================================================================
// Submission
// =============================================================================

/// Submit a new complaint
pub async fn create_complaint(
    State(state): State<AppState>,
    Json(input): Json<CreateComplaint>,
) -> impl IntoResponse {
    match state.pipeline.submit(input).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(outcome.receipt())),
        ),
        Err(PipelineError::Validation(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<SubmissionReceipt>::error(e.to_string())),
        ),
        Err(e @ (PipelineError::ClassificationTimeout(_) | PipelineError::Classifier(_))) => {
            tracing::warn!("Complaint classification failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(
                    "Classification service is unavailable. Please try again later.",
                )),
            )
        }
        Err(e) => {
            tracing::error!("Failed to store complaint: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to submit complaint")),
            )
        }
    }
}

// =============================================================================
// Tracking
// =============================================================================

/// Get a complaint with its status history
pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match load_complaint(&state, &id).await {
        Ok(complaint) => (
            StatusCode::OK,
            Json(ApiResponse::success(ComplaintResponse::from(complaint))),
        ),
        Err((status, message)) => (status, Json(ApiResponse::error(message))),
    }
}

/// Get the hash chain for a complaint and whether it verifies
pub async fn get_complaint_ledger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match load_complaint(&state, &id).await {
        Ok(complaint) => {
            let view = ledger_view(&complaint);
            if !view.verified {
                tracing::warn!("Ledger verification failed for complaint {}", complaint.id);
            }
            (StatusCode::OK, Json(ApiResponse::success(view)))
        }
        Err((status, message)) => (status, Json(ApiResponse::<LedgerView>::error(message))),
    }
}
