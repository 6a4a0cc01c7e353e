use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{NewWorker, Worker, WorkerUpdate};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;
use log::{info, warn};
use serde::Deserialize;

/// Query parameters for the workers list
#[derive(Debug, Default, Deserialize)]
pub struct WorkerSearchParams {
    pub search: Option<String>,
}

/// Create workers controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workers).post(create_worker))
        .route(
            "/:id",
            get(get_worker).put(update_worker).delete(delete_worker),
        )
}

pub async fn list_workers(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<WorkerSearchParams>, ApiError>,
) -> ApiResult<Json<Vec<Worker>>> {
    let workers = match params.search.as_deref() {
        Some(query) => state.repos.workers.search(query).await?,
        None => state.repos.workers.get_all().await?,
    };
    Ok(Json(workers))
}

pub async fn get_worker(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Worker>> {
    Ok(Json(state.repos.workers.get_by_id(id).await?))
}

pub async fn create_worker(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<NewWorker>, ApiError>,
) -> ApiResult<(StatusCode, Json<Worker>)> {
    let worker = state.repos.workers.create(request).await?;
    info!("Created worker {} ({})", worker.id, worker.employee_id);

    if let Err(e) = state.events.worker_created(&worker).await {
        warn!("Failed to publish worker created event: {}", e);
    }

    Ok((StatusCode::CREATED, Json(worker)))
}

pub async fn update_worker(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(update), _): WithRejection<Json<WorkerUpdate>, ApiError>,
) -> ApiResult<Json<Worker>> {
    let worker = state.repos.workers.update(id, update).await?;

    if let Err(e) = state.events.worker_updated(&worker).await {
        warn!("Failed to publish worker updated event: {}", e);
    }

    Ok(Json(worker))
}

pub async fn delete_worker(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    state.repos.workers.delete(id).await?;

    if let Err(e) = state.events.worker_deleted(id).await {
        warn!("Failed to publish worker deleted event: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::rest::test_support::app;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_and_search() {
        let app = app();

        let (status, body) = app.get("/api/workers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 8);

        let (_, body) = app.get("/api/workers?search=welding").await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["fullName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Sarah Chen", "Aisha Rahman"]);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let app = app();

        let (status, created) = app
            .send(
                Method::POST,
                "/api/workers",
                Some(json!({
                    "fullName": "Priya Nair",
                    "username": "pnair",
                    "employeeId": "EMP009",
                    "department": "Electrical"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["Id"], 9);

        let (status, updated) = app
            .send(
                Method::PUT,
                "/api/workers/9",
                Some(json!({ "department": "Logistics" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["department"], "Logistics");
        assert_eq!(updated["fullName"], "Priya Nair");

        let (status, _) = app.send(Method::DELETE, "/api/workers/9", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app.get("/api/workers/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_create_with_blank_name_is_unprocessable() {
        let app = app();
        let (status, body) = app
            .send(
                Method::POST,
                "/api/workers",
                Some(json!({
                    "fullName": "  ",
                    "username": "x",
                    "employeeId": "EMP010",
                    "department": "Electrical"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("fullName"));
    }
}
