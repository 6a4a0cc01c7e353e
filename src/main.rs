use anyhow::Result;
use log::{error, info, warn};
use ppe_monitor::api::rest::{AppState, RestApi};
use ppe_monitor::config;
use ppe_monitor::db::repositories::Repositories;
use ppe_monitor::db::MemoryStore;
use ppe_monitor::messaging::{broker::create_message_broker, SafetyEvents};
use ppe_monitor::services::{AnalyticsService, LiveMonitor};
use ppe_monitor::utils::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

async fn run_app() -> Result<()> {
    // Configuration path is the first argument, defaults otherwise
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load_config(config_path.as_deref())?;

    // Initialize logging; RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting PPE compliance monitor");
    info!("Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(&config)?.with_clock(clock.clone()));
    let repos = Repositories::new(store.clone());

    // Create the in-process message broker
    let message_broker = create_message_broker(config.monitor.event_buffer);
    let events = SafetyEvents::new(message_broker.clone());
    info!("Message broker initialized");

    if let Err(e) = events.system_startup(env!("CARGO_PKG_VERSION")).await {
        warn!("Failed to publish system startup event: {}", e);
    }
    let alert_log = events.log_alerts().await?;

    let analytics = Arc::new(AnalyticsService::new(
        Arc::new(repos.clone()),
        clock.clone(),
    ));

    // Create and start the live monitor
    let monitor = Arc::new(
        LiveMonitor::new(
            Arc::new(repos.clone()),
            clock.clone(),
            config.monitor.clone(),
        )
        .with_message_broker(message_broker.clone()),
    );
    monitor.clone().start().await?;
    info!("Live monitor started");

    let state = AppState {
        store,
        repos,
        analytics,
        monitor: monitor.clone(),
        events: events.clone(),
        clock,
    };
    let http_server = RestApi::new(&config.api, state)?;

    // Serve until the server fails or a termination signal arrives
    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!("API server stopped: {}", e);
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down...");
        }
    }

    monitor.shutdown().await;
    if let Err(e) = events.cancel(&alert_log).await {
        warn!("Failed to stop alert log: {}", e);
    }

    if let Err(e) = events.system_shutdown().await {
        error!("Failed to publish shutdown event: {}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
