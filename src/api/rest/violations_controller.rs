use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{
    NewViolation, Violation, ViolationStatus, ViolationUpdate, ViolationWithWorker,
};
use crate::services::ViolationFilter;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, put};
use axum::Router;
use axum_extra::extract::WithRejection;
use log::{debug, warn};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ViolationStatus,
}

/// Create violations controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_violations).post(create_violation))
        .route(
            "/:id",
            get(get_violation)
                .put(update_violation)
                .delete(delete_violation),
        )
        .route("/:id/status", put(set_violation_status))
}

/// Joined violations, most recent first, narrowed by the query filter
pub async fn list_violations(
    State(state): State<AppState>,
    WithRejection(Query(filter), _): WithRejection<Query<ViolationFilter>, ApiError>,
) -> ApiResult<Json<Vec<ViolationWithWorker>>> {
    let violations = state.repos.violations.get_all().await?;
    if filter.is_empty() {
        return Ok(Json(violations));
    }

    let filtered = filter.apply(&violations, state.clock.now());
    debug!(
        "Violation filter {:?} kept {} of {}",
        filter,
        filtered.len(),
        violations.len()
    );
    Ok(Json(filtered))
}

pub async fn get_violation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<ViolationWithWorker>> {
    Ok(Json(state.repos.violations.get_by_id(id).await?))
}

pub async fn create_violation(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<NewViolation>, ApiError>,
) -> ApiResult<(StatusCode, Json<Violation>)> {
    let violation = state.repos.violations.create(request).await?;

    if let Err(e) = state.events.violation_created(&violation).await {
        warn!("Failed to publish violation created event: {}", e);
    }

    Ok((StatusCode::CREATED, Json(violation)))
}

pub async fn update_violation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(update), _): WithRejection<Json<ViolationUpdate>, ApiError>,
) -> ApiResult<Json<Violation>> {
    let previous = state.repos.violations.get_by_id(id).await?;
    let violation = state.repos.violations.update(id, update).await?;

    if let Err(e) = state
        .events
        .violation_updated(&violation, previous.violation.status)
        .await
    {
        warn!("Failed to publish violation updated event: {}", e);
    }

    Ok(Json(violation))
}

pub async fn set_violation_status(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(request), _): WithRejection<Json<StatusRequest>, ApiError>,
) -> ApiResult<Json<Violation>> {
    let previous = state.repos.violations.get_by_id(id).await?;
    let violation = state.repos.violations.set_status(id, request.status).await?;

    if let Err(e) = state
        .events
        .violation_updated(&violation, previous.violation.status)
        .await
    {
        warn!("Failed to publish violation status event: {}", e);
    }

    Ok(Json(violation))
}

pub async fn delete_violation(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    state.repos.violations.delete(id).await?;

    if let Err(e) = state.events.violation_deleted(id).await {
        warn!("Failed to publish violation deleted event: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::rest::test_support::app;
    use crate::messaging::EventType;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn ids(body: &Value) -> Vec<i64> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|v| v["Id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_joined() {
        let app = app();
        let (status, body) = app.get("/api/violations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![2, 1, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(body[0]["worker"]["fullName"], "Sarah Chen");
        assert_eq!(body[0]["missingPPE"], json!(["jacket", "shoes"]));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let app = app();

        let (_, body) = app.get("/api/violations?dateRange=week").await;
        assert_eq!(ids(&body), vec![2, 1, 3, 4, 5, 6, 7, 8]);

        let (_, body) = app.get("/api/violations?dateRange=today").await;
        assert!(ids(&body).is_empty());

        let (_, body) = app.get("/api/violations?search=martinez&status=pending").await;
        assert_eq!(ids(&body), vec![1, 3]);

        let (_, body) = app.get("/api/violations?ppe=shoes&search=&status=").await;
        assert_eq!(ids(&body), vec![2, 4, 8, 10]);

        let (status, _) = app.get("/api/violations?ppe=gloves").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_requests_use_error_body() {
        let app = app();

        let (status, body) = app.get("/api/violations?ppe=gloves").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["message"].as_str().unwrap().contains("gloves"));

        let (status, body) = app.get("/api/violations/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body["message"].is_string());

        let (status, body) = app
            .send(
                Method::POST,
                "/api/violations",
                Some(json!({ "cameraId": 1, "missingPPE": ["helmet"] })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["status"], 422);
        assert!(body["message"].as_str().unwrap().contains("workerId"));
    }

    #[tokio::test]
    async fn test_create_prices_and_dedups() {
        let app = app();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/violations",
                Some(json!({
                    "workerId": 1,
                    "cameraId": 1,
                    "missingPPE": ["helmet", "helmet", "shoes"],
                    "location": "Zone A"
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["Id"], 11);
        assert_eq!(body["missingPPE"], json!(["helmet", "shoes"]));
        assert_eq!(body["fineAmount"], 75.0);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["timestamp"], "2024-06-04T12:00:00Z");
    }

    #[tokio::test]
    async fn test_create_with_unknown_worker_is_unprocessable() {
        let app = app();
        let (status, _) = app
            .send(
                Method::POST,
                "/api/violations",
                Some(json!({ "workerId": 99, "cameraId": 1, "missingPPE": ["helmet"] })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_resolve_stamps_and_publishes() {
        let app = app();
        let mut events = app.broker.receiver();

        let (status, body) = app
            .send(
                Method::PUT,
                "/api/violations/1/status",
                Some(json!({ "status": "resolved" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "resolved");
        assert_eq!(body["resolvedAt"], "2024-06-04T12:00:00Z");

        let event = events.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::ViolationResolved);
        assert_eq!(event.source_id, Some(1));
    }

    #[tokio::test]
    async fn test_deleted_worker_leaves_violation_unjoined() {
        let app = app();
        let (status, _) = app.send(Method::DELETE, "/api/workers/7", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app.get("/api/violations/10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workerId"], 7);
        assert!(body["worker"].is_null());

        let (_, body) = app.get("/api/violations?search=silva").await;
        assert!(ids(&body).is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let app = app();
        let (status, _) = app.send(Method::DELETE, "/api/violations/3", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.get("/api/violations/3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
