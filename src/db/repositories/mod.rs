use crate::db::models::{Camera, PpeConfig, PpeConfigUpdate, PpeType, Violation, Worker};
use crate::db::MemoryStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod cameras;
pub mod settings;
pub mod violations;
pub mod workers;

pub use cameras::CamerasRepository;
pub use settings::SettingsRepository;
pub use violations::ViolationsRepository;
pub use workers::WorkersRepository;

/// Data the analytics and monitoring services read from their environment
#[async_trait]
pub trait SafetyDataSource: Send + Sync {
    /// Violations in stored order
    async fn list_violations(&self) -> Result<Vec<Violation>>;

    async fn list_workers(&self) -> Result<Vec<Worker>>;

    async fn list_cameras(&self) -> Result<Vec<Camera>>;

    async fn get_ppe_config(&self) -> Result<Vec<PpeConfig>>;

    async fn update_ppe_config(&self, ppe_type: PpeType, update: PpeConfigUpdate)
        -> Result<PpeConfig>;
}

/// Every repository over one shared store
#[derive(Clone)]
pub struct Repositories {
    pub workers: WorkersRepository,
    pub cameras: CamerasRepository,
    pub violations: ViolationsRepository,
    pub settings: SettingsRepository,
}

impl Repositories {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            workers: WorkersRepository::new(store.clone()),
            cameras: CamerasRepository::new(store.clone()),
            violations: ViolationsRepository::new(store.clone()),
            settings: SettingsRepository::new(store),
        }
    }
}

#[async_trait]
impl SafetyDataSource for Repositories {
    async fn list_violations(&self) -> Result<Vec<Violation>> {
        self.violations.list().await
    }

    async fn list_workers(&self) -> Result<Vec<Worker>> {
        self.workers.get_all().await
    }

    async fn list_cameras(&self) -> Result<Vec<Camera>> {
        self.cameras.get_all().await
    }

    async fn get_ppe_config(&self) -> Result<Vec<PpeConfig>> {
        self.settings.get_ppe_configs().await
    }

    async fn update_ppe_config(
        &self,
        ppe_type: PpeType,
        update: PpeConfigUpdate,
    ) -> Result<PpeConfig> {
        self.settings.update_ppe_config(ppe_type, update).await
    }
}
