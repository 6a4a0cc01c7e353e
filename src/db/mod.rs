use crate::config::Config;
use crate::db::models::{Camera, PpeConfig, PpeType, SystemSettings, Violation, Worker};
use crate::utils::{Clock, SystemClock};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub mod collection;
pub mod fixtures;
pub mod latency;
pub mod models;
pub mod repositories;

pub use collection::Collection;
pub use fixtures::Fixtures;
pub use latency::{Operation, SimulatedLatency};

/// In-memory stand-in for the monitoring backend's database
pub struct MemoryStore {
    pub workers: Collection<Worker>,
    pub cameras: Collection<Camera>,
    pub violations: Collection<Violation>,
    /// Exactly one entry per PPE category
    pub ppe_configs: RwLock<BTreeMap<PpeType, PpeConfig>>,
    pub system_settings: RwLock<SystemSettings>,
    pub latency: SimulatedLatency,
    /// Source of creation and resolution timestamps
    pub clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create a store seeded from the configured fixtures
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing in-memory store");

        let fixtures = match &config.store.fixtures_dir {
            Some(dir) => {
                info!("Loading fixtures from {:?}", dir);
                Fixtures::load_dir(dir)?
            }
            None => Fixtures::builtin()?,
        };

        let store = Self::from_fixtures(fixtures, SimulatedLatency::new(config.latency.clone()));

        info!("In-memory store ready");
        Ok(store)
    }

    pub fn from_fixtures(fixtures: Fixtures, latency: SimulatedLatency) -> Self {
        info!(
            "Seeding store with {} workers, {} cameras, {} violations",
            fixtures.workers.len(),
            fixtures.cameras.len(),
            fixtures.violations.len()
        );

        let ppe_configs = PpeType::ALL
            .into_iter()
            .map(|ppe| (ppe, PpeConfig::default_for(ppe)))
            .collect();

        Self {
            workers: Collection::new(fixtures.workers),
            cameras: Collection::new(fixtures.cameras),
            violations: Collection::new(fixtures.violations),
            ppe_configs: RwLock::new(ppe_configs),
            system_settings: RwLock::new(SystemSettings::default()),
            latency,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to stamp new and resolved records
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current instant according to the store's clock
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    /// Empty store without latency
    pub fn empty() -> Self {
        Self::from_fixtures(Fixtures::default(), SimulatedLatency::disabled())
    }

    /// Health check for the store
    pub async fn health_check(&self) -> bool {
        self.ppe_configs.read().await.len() == PpeType::ALL.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_has_one_config_per_category() {
        let store = MemoryStore::empty();
        assert!(store.health_check().await);

        let configs = store.ppe_configs.read().await;
        for ppe in PpeType::ALL {
            assert_eq!(configs[&ppe].ppe_type, ppe);
        }
    }

    #[tokio::test]
    async fn test_default_config_seeds_builtin_fixtures() {
        let mut config = Config::default();
        config.latency.enabled = false;

        let store = MemoryStore::new(&config).unwrap();
        assert!(store.workers.len().await > 0);
    }
}
