use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::services::{AnalyticsSummary, Period};
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::WithRejection;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    #[serde(default)]
    pub period: Period,
}

/// Create analytics controller router
pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(get_analytics))
}

pub async fn get_analytics(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<AnalyticsParams>, ApiError>,
) -> ApiResult<Json<AnalyticsSummary>> {
    Ok(Json(state.analytics.get_analytics(params.period).await?))
}
