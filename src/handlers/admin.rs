//! Admin handlers: complaint list, dashboard counts and status changes

use crate::models::*;
use crate::repository::RepositoryError;
use crate::validation::validate_status_change;
use crate::view::{filter_and_sort, stats, ComplaintFilter, ComplaintStats, ListQuery};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::AppState;

/// List complaints, highest priority first
pub async fn list_complaints(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let filter = match ComplaintFilter::from_query(&query) {
        Ok(filter) => filter,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<Vec<ComplaintResponse>>::error(e.to_string())),
            )
        }
    };

    match state.repo.list().await {
        Ok(complaints) => {
            let listed: Vec<ComplaintResponse> = filter_and_sort(complaints, &filter)
                .into_iter()
                .map(ComplaintResponse::from)
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(listed)))
        }
        Err(e) => {
            tracing::error!("Failed to list complaints: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Database error")),
            )
        }
    }
}

/// Per-stage counts for the admin dashboard
pub async fn get_complaint_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.list().await {
        Ok(complaints) => (StatusCode::OK, Json(ApiResponse::success(stats(&complaints)))),
        Err(e) => {
            tracing::error!("Failed to compute complaint stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<ComplaintStats>::error("Database error")),
            )
        }
    }
}

/// Append a status entry to a complaint
pub async fn update_complaint_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateStatusRequest>,
) -> impl IntoResponse {
    let id = match ComplaintId::parse(&id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<ComplaintResponse>::error(e.to_string())),
            )
        }
    };

    let change = match validate_status_change(&input) {
        Ok(change) => change,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    };

    let department = change.department.clone();
    match state.repo.append_update(&id, change).await {
        Ok(complaint) => {
            tracing::info!(
                "Complaint {} moved to {} by {}",
                complaint.id,
                complaint.status,
                department
            );
            (
                StatusCode::OK,
                Json(ApiResponse::success(ComplaintResponse::from(complaint))),
            )
        }
        Err(RepositoryError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Complaint not found")),
        ),
        Err(RepositoryError::InvalidTransition(e)) => {
            (StatusCode::CONFLICT, Json(ApiResponse::error(e.to_string())))
        }
        Err(e) => {
            tracing::error!("Failed to update complaint {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to update complaint")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{body_json, test_app};
    use crate::models::ComplaintId;
    use crate::repository::ComplaintRepository;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn patch_status(id: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/complaints/{}/status", id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_priority() {
        let (app, _) = test_app().await;

        let response = app.oneshot(get("/api/complaints")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let priorities: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["priority"].as_str().unwrap())
            .collect();
        assert_eq!(
            priorities,
            vec!["high", "high", "high", "medium", "medium", "low"]
        );
        assert_eq!(body["data"][0]["id"], "CIV-001234");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(get("/api/complaints?search=pothole&status=all&priority=all"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], "CIV-001236");

        let response = app
            .clone()
            .oneshot(get("/api/complaints?status=resolved&priority=high"))
            .await
            .unwrap();
        let body = body_json(response).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["CIV-001235", "CIV-001237"]);

        let response = app
            .oneshot(get("/api/complaints?priority=urgent"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_filter_agrees_with_stats() {
        let (app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(get("/api/complaints?status=in_progress"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["CIV-001234", "CIV-001236"]);

        let stats = body_json(app.oneshot(get("/api/complaints/stats")).await.unwrap()).await;
        assert_eq!(stats["data"]["in_progress"], ids.len());
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _) = test_app().await;

        let response = app.oneshot(get("/api/complaints/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(
            body["data"],
            json!({
                "total": 6,
                "submitted": 1,
                "assigned": 0,
                "in_progress": 2,
                "resolved": 3,
                "rejected": 0
            })
        );
    }

    #[tokio::test]
    async fn test_status_walk_through_lifecycle() {
        let (app, repo) = test_app().await;

        let response = app
            .clone()
            .oneshot(patch_status(
                "CIV-001238",
                json!({
                    "status": "assigned",
                    "description": "Assigned to the environmental team",
                    "department": "Admin"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "assigned");
        assert_eq!(body["data"]["progress"], 25);
        assert_eq!(body["data"]["assigned_to"], "Environmental Dept");

        let response = app
            .clone()
            .oneshot(patch_status(
                "CIV-001238",
                json!({
                    "status": "update",
                    "description": "Site visit booked",
                    "department": "Environmental Dept",
                    "progress": 90
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"], "update");
        assert_eq!(body["data"]["stage"], "assigned");
        assert_eq!(body["data"]["progress"], 64);

        let stored = repo
            .find(&ComplaintId::parse("CIV-001238").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.updates.len(), 3);
        assert!(crate::ledger::verify(&stored));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_conflict() {
        let (app, repo) = test_app().await;

        let response = app
            .oneshot(patch_status(
                "CIV-001235",
                json!({
                    "status": "in_progress",
                    "description": "Reopening",
                    "department": "Admin"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let stored = repo
            .find(&ComplaintId::parse("CIV-001235").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.updates.len(), 4);
    }

    #[tokio::test]
    async fn test_status_change_errors() {
        let (app, _) = test_app().await;
        let body = json!({
            "status": "assigned",
            "description": "Assigned",
            "department": "Admin"
        });

        let response = app
            .clone()
            .oneshot(patch_status("CIV-999999", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(patch_status("not-an-id", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(patch_status(
                "CIV-001238",
                json!({"status": "closed", "description": "x", "department": "Admin"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
