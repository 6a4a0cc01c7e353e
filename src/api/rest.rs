use crate::config::ApiConfig;
use crate::db::repositories::Repositories;
use crate::db::MemoryStore;
use crate::error::Error;
use crate::messaging::SafetyEvents;
use crate::services::{AnalyticsService, LiveMonitor};
use crate::utils::Clock;
use anyhow::Result;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::info;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod analytics_controller;
pub mod cameras_controller;
pub mod monitor_controller;
pub mod settings_controller;
pub mod violations_controller;
pub mod workers_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub repos: Repositories,
    pub analytics: Arc<AnalyticsService>,
    pub monitor: Arc<LiveMonitor>,
    pub events: SafetyEvents,
    pub clock: Arc<dyn Clock>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Config(_) => StatusCode::BAD_REQUEST,
            Error::Serialization(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        ApiError::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = Error::find(&err) {
            return err.clone().into();
        }

        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

/// Implement IntoResponse for ApiError
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    store: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.store.health_check().await;
    Json(HealthResponse {
        status: if store { "ok" } else { "degraded" },
        store,
    })
}

/// Every API route over `state`, without middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/workers", workers_controller::create_router())
        .nest("/api/cameras", cameras_controller::create_router())
        .nest("/api/violations", violations_controller::create_router())
        .nest("/api/analytics", analytics_controller::create_router())
        .nest("/api/settings", settings_controller::create_router())
        .nest("/api/monitor", monitor_controller::create_router())
        .with_state(state)
}

pub struct RestApi {
    config: ApiConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(config: &ApiConfig, state: AppState) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            state,
        })
    }

    pub async fn run(&self) -> Result<()> {
        // Create a CORS layer that allows all origins and preflight requests
        use std::time::Duration;
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(false)
            .max_age(Duration::from_secs(3600));

        let app = router(self.state.clone()).layer(cors);

        // Build the server address
        let addr = self.config.address.clone() + ":" + &self.config.port.to_string();
        let addr: SocketAddr = addr.parse()?;

        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::db::{Fixtures, SimulatedLatency};
    use crate::messaging::broker::create_message_broker;
    use crate::messaging::MessageBroker;
    use crate::utils::FixedClock;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::DateTime;
    use serde_json::Value;
    use tower::ServiceExt;

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        pub broker: Arc<MessageBroker>,
    }

    /// App over the built-in fixtures, no latency, clock at 2024-06-04 12:00 UTC
    pub fn app() -> TestApp {
        let clock = Arc::new(FixedClock::new(
            DateTime::parse_from_rfc3339("2024-06-04T12:00:00+00:00").unwrap(),
        ));
        let fixtures = Fixtures::builtin().unwrap();
        let store = Arc::new(
            MemoryStore::from_fixtures(fixtures, SimulatedLatency::disabled())
                .with_clock(clock.clone()),
        );
        let repos = Repositories::new(store.clone());
        let broker = create_message_broker(64);
        let monitor = LiveMonitor::new(
            Arc::new(repos.clone()),
            clock.clone(),
            MonitorConfig::default(),
        )
        .with_message_broker(broker.clone());

        let state = AppState {
            store,
            repos: repos.clone(),
            analytics: Arc::new(AnalyticsService::new(Arc::new(repos), clock.clone())),
            monitor: Arc::new(monitor),
            events: SafetyEvents::new(broker.clone()),
            clock,
        };

        TestApp {
            router: router(state.clone()),
            state,
            broker,
        }
    }

    impl TestApp {
        pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let request = Request::builder().method(method).uri(uri);
            let request = match body {
                Some(body) => request
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };
            (status, value)
        }

        pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Method::GET, uri, None).await
        }
    }
}
