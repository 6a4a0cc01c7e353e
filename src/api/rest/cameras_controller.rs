use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{Camera, CameraUpdate, NewCamera};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;
use log::warn;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CameraListParams {
    /// Only cameras that are currently online
    #[serde(default)]
    pub active: bool,
}

/// Create cameras controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cameras).post(create_camera))
        .route(
            "/:id",
            get(get_camera).put(update_camera).delete(delete_camera),
        )
}

pub async fn list_cameras(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<CameraListParams>, ApiError>,
) -> ApiResult<Json<Vec<Camera>>> {
    let cameras = if params.active {
        state.repos.cameras.get_active().await?
    } else {
        state.repos.cameras.get_all().await?
    };
    Ok(Json(cameras))
}

pub async fn get_camera(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Camera>> {
    Ok(Json(state.repos.cameras.get_by_id(id).await?))
}

pub async fn create_camera(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<NewCamera>, ApiError>,
) -> ApiResult<(StatusCode, Json<Camera>)> {
    let camera = state.repos.cameras.create(request).await?;

    if let Err(e) = state.events.camera_created(&camera).await {
        warn!("Failed to publish camera created event: {}", e);
    }

    Ok((StatusCode::CREATED, Json(camera)))
}

pub async fn update_camera(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(update), _): WithRejection<Json<CameraUpdate>, ApiError>,
) -> ApiResult<Json<Camera>> {
    let camera = state.repos.cameras.update(id, update).await?;

    if let Err(e) = state.events.camera_updated(&camera).await {
        warn!("Failed to publish camera updated event: {}", e);
    }

    Ok(Json(camera))
}

pub async fn delete_camera(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    let camera = state.repos.cameras.delete(id).await?;

    if let Err(e) = state.events.camera_deleted(camera.id, &camera.name).await {
        warn!("Failed to publish camera deleted event: {}", e);
    }

    Ok(StatusCode::NO_CONTENT)
}
