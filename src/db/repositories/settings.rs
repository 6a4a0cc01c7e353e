use crate::db::models::{PpeConfig, PpeConfigUpdate, PpeType, SystemSettings};
use crate::db::{MemoryStore, Operation};
use crate::error::Error;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Settings repository for PPE configuration and system settings
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<MemoryStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Every PPE configuration, in category order
    pub async fn get_ppe_configs(&self) -> Result<Vec<PpeConfig>> {
        self.store.latency.wait(Operation::List).await;
        Ok(self.store.ppe_configs.read().await.values().cloned().collect())
    }

    pub async fn get_ppe_config(&self, ppe_type: PpeType) -> Result<PpeConfig> {
        self.store.latency.wait(Operation::Get).await;
        self.store
            .ppe_configs
            .read()
            .await
            .get(&ppe_type)
            .cloned()
            .ok_or_else(|| {
                anyhow::Error::from(Error::NotFound(format!("PPE type not found: {}", ppe_type)))
            })
    }

    pub async fn update_ppe_config(
        &self,
        ppe_type: PpeType,
        update: PpeConfigUpdate,
    ) -> Result<PpeConfig> {
        self.store.latency.wait(Operation::Update).await;
        update.validate()?;

        let mut configs = self.store.ppe_configs.write().await;
        let config = configs
            .get_mut(&ppe_type)
            .ok_or_else(|| Error::NotFound(format!("PPE type not found: {}", ppe_type)))?;
        update.apply(config);

        info!("Updated PPE configuration for {}", ppe_type);
        Ok(config.clone())
    }

    pub async fn get_system_settings(&self) -> Result<SystemSettings> {
        self.store.latency.wait(Operation::Get).await;
        Ok(self.store.system_settings.read().await.clone())
    }

    pub async fn update_system_settings(&self, settings: SystemSettings) -> Result<SystemSettings> {
        self.store.latency.wait(Operation::Update).await;
        settings.validate()?;

        *self.store.system_settings.write().await = settings.clone();
        info!("Updated system settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SettingsRepository {
        SettingsRepository::new(Arc::new(MemoryStore::empty()))
    }

    #[tokio::test]
    async fn test_configs_listed_once_per_category() -> Result<()> {
        let configs = repo().get_ppe_configs().await?;
        let types: Vec<PpeType> = configs.iter().map(|c| c.ppe_type).collect();
        assert_eq!(types, PpeType::ALL.to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_merges_fields() -> Result<()> {
        let repo = repo();
        let updated = repo
            .update_ppe_config(
                PpeType::Shoes,
                PpeConfigUpdate {
                    fine_amount: Some(40.0),
                    ..Default::default()
                },
            )
            .await?;

        assert_eq!(updated.fine_amount, 40.0);
        assert_eq!(updated.detection_threshold, 0.75);
        assert_eq!(repo.get_ppe_config(PpeType::Shoes).await?, updated);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_config_untouched() -> Result<()> {
        let repo = repo();
        let err = repo
            .update_ppe_config(
                PpeType::Helmet,
                PpeConfigUpdate {
                    fine_amount: Some(-5.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(Error::find(&err), Some(Error::Validation(_))));
        assert_eq!(repo.get_ppe_config(PpeType::Helmet).await?.fine_amount, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_system_settings_persist() -> Result<()> {
        let repo = repo();
        let mut settings = repo.get_system_settings().await?;
        settings.sms_alerts = false;
        repo.update_system_settings(settings.clone()).await?;
        assert_eq!(repo.get_system_settings().await?, settings);
        Ok(())
    }
}
