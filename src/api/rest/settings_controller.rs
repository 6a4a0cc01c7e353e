use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::db::models::{PpeConfig, PpeConfigUpdate, PpeType, SystemSettings};
use crate::db::repositories::SafetyDataSource;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;
use log::warn;

/// Create settings controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ppe", get(get_ppe_configs))
        .route(
            "/ppe/:ppe_type",
            get(get_ppe_config).put(update_ppe_config),
        )
        .route(
            "/system",
            get(get_system_settings).put(update_system_settings),
        )
}

pub async fn get_ppe_configs(State(state): State<AppState>) -> ApiResult<Json<Vec<PpeConfig>>> {
    Ok(Json(state.repos.get_ppe_config().await?))
}

pub async fn get_ppe_config(
    State(state): State<AppState>,
    WithRejection(Path(ppe_type), _): WithRejection<Path<String>, ApiError>,
) -> ApiResult<Json<PpeConfig>> {
    let ppe_type: PpeType = ppe_type.parse()?;
    Ok(Json(state.repos.settings.get_ppe_config(ppe_type).await?))
}

pub async fn update_ppe_config(
    State(state): State<AppState>,
    WithRejection(Path(ppe_type), _): WithRejection<Path<String>, ApiError>,
    WithRejection(Json(update), _): WithRejection<Json<PpeConfigUpdate>, ApiError>,
) -> ApiResult<Json<PpeConfig>> {
    let ppe_type: PpeType = ppe_type.parse()?;
    let config = state.repos.update_ppe_config(ppe_type, update).await?;

    if let Err(e) = state.events.ppe_config_updated(&config).await {
        warn!("Failed to publish PPE config event: {}", e);
    }

    Ok(Json(config))
}

pub async fn get_system_settings(State(state): State<AppState>) -> ApiResult<Json<SystemSettings>> {
    Ok(Json(state.repos.settings.get_system_settings().await?))
}

pub async fn update_system_settings(
    State(state): State<AppState>,
    WithRejection(Json(settings), _): WithRejection<Json<SystemSettings>, ApiError>,
) -> ApiResult<Json<SystemSettings>> {
    let settings = state.repos.settings.update_system_settings(settings).await?;

    if let Err(e) = state.events.system_settings_updated().await {
        warn!("Failed to publish system settings event: {}", e);
    }

    Ok(Json(settings))
}
