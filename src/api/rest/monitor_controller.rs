use crate::api::rest::{ApiError, ApiResult, AppState};
use crate::services::monitoring::{Detection, MonitorSnapshot};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get};
use axum::Router;
use axum_extra::extract::WithRejection;

/// Create live monitor controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/cameras/:id/detections", get(get_detections))
        .route("/alerts/:id", delete(dismiss_alert))
}

/// Latest live snapshot, polling once if the monitor has not yet
pub async fn get_snapshot(State(state): State<AppState>) -> ApiResult<Json<MonitorSnapshot>> {
    let snapshot = match state.monitor.snapshot().await {
        Some(snapshot) => snapshot,
        None => state.monitor.refresh().await?,
    };
    Ok(Json(snapshot))
}

pub async fn get_detections(
    State(state): State<AppState>,
    WithRejection(Path(camera_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Vec<Detection>>> {
    Ok(Json(state.monitor.detections(camera_id).await?))
}

pub async fn dismiss_alert(
    State(state): State<AppState>,
    WithRejection(Path(violation_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    state.monitor.dismiss_alert(violation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::rest::test_support::app;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_snapshot_alerts_and_detections() {
        let app = app();

        let (status, body) = app.get("/api/monitor").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["totalWorkers"], 7);
        assert_eq!(body["stats"]["activeViolations"], 5);
        assert_eq!(body["stats"]["complianceRate"], 29);
        assert_eq!(body["stats"]["activeCameras"], 3);
        assert!(body["activeAlerts"].as_array().unwrap().is_empty());

        let (status, _) = app
            .send(
                Method::POST,
                "/api/violations",
                Some(json!({ "workerId": 8, "cameraId": 2, "missingPPE": ["jacket"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        app.state.monitor.refresh().await.unwrap();
        let (_, body) = app.get("/api/monitor").await;
        let alerts = body["activeAlerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["Id"], 11);
        assert_eq!(alerts[0]["worker"]["fullName"], "Hannah Becker");

        let (status, detections) = app.get("/api/monitor/cameras/2/detections").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detections[0]["violationId"], 11);
        assert_eq!(detections[0]["boundingBox"], json!({"x": 20, "y": 30, "width": 15, "height": 25}));

        let (status, _) = app.get("/api/monitor/cameras/99/detections").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send(Method::DELETE, "/api/monitor/alerts/11", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = app.get("/api/monitor").await;
        assert!(body["activeAlerts"].as_array().unwrap().is_empty());

        let (status, _) = app.send(Method::DELETE, "/api/monitor/alerts/11", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
