//! HTTP request handlers

pub mod admin;
pub mod complaints;
pub mod middleware;

pub use admin::*;
pub use complaints::*;

use crate::models::{Complaint, ComplaintId};
use crate::pipeline::SubmissionPipeline;
use crate::repository::ComplaintRepository;
use axum::{
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ComplaintRepository>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub is_production: bool,
}

/// All routes under `/api`, with security headers applied
pub fn api_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/complaints", post(create_complaint).get(list_complaints))
        .route("/complaints/stats", get(get_complaint_stats))
        .route("/complaints/:id", get(get_complaint))
        .route("/complaints/:id/status", patch(update_complaint_status))
        .route("/complaints/:id/ledger", get(get_complaint_ledger));

    Router::new()
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::security_headers,
        ))
        .with_state(state)
}

/// Parse a path ID and fetch the complaint, mapping failures to a status code
pub(crate) async fn load_complaint(
    state: &AppState,
    id: &str,
) -> Result<Complaint, (StatusCode, String)> {
    let id = ComplaintId::parse(id).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.repo.find(&id).await {
        Ok(Some(complaint)) => Ok(complaint),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Complaint not found".to_string())),
        Err(e) => {
            tracing::error!("Database error loading complaint {}: {}", id, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ))
        }
    }
}
