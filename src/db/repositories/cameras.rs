use crate::db::models::{Camera, CameraUpdate, NewCamera};
use crate::db::{MemoryStore, Operation};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Cameras repository for handling camera operations
#[derive(Clone)]
pub struct CamerasRepository {
    store: Arc<MemoryStore>,
}

impl CamerasRepository {
    /// Create a new cameras repository
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Create a new camera
    pub async fn create(&self, camera: NewCamera) -> Result<Camera> {
        self.store.latency.wait(Operation::Create).await;
        camera.validate()?;

        info!("Creating new camera: {}", camera.name);
        Ok(self
            .store
            .cameras
            .insert_with(|id| camera.into_camera(id))
            .await)
    }

    /// Get camera by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Camera> {
        self.store.latency.wait(Operation::Get).await;
        Ok(self.store.cameras.get(id).await?)
    }

    /// Update camera
    pub async fn update(&self, id: i64, update: CameraUpdate) -> Result<Camera> {
        self.store.latency.wait(Operation::Update).await;
        update.validate()?;

        Ok(self
            .store
            .cameras
            .update_with(id, |camera| update.apply(camera))
            .await?)
    }

    /// Delete camera
    pub async fn delete(&self, id: i64) -> Result<Camera> {
        self.store.latency.wait(Operation::Delete).await;
        let camera = self.store.cameras.remove(id).await?;
        info!("Deleted camera {} ({})", id, camera.name);
        Ok(camera)
    }

    /// Get all cameras
    pub async fn get_all(&self) -> Result<Vec<Camera>> {
        self.store.latency.wait(Operation::List).await;
        Ok(self.store.cameras.all().await)
    }

    /// Get cameras that are currently online
    pub async fn get_active(&self) -> Result<Vec<Camera>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|camera| camera.is_active)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Fixtures, SimulatedLatency};
    use crate::error::Error;

    fn repo() -> CamerasRepository {
        let store = MemoryStore::from_fixtures(
            Fixtures::builtin().unwrap(),
            SimulatedLatency::disabled(),
        );
        CamerasRepository::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_new_camera_defaults_to_active() -> Result<()> {
        let repo = repo();
        let before = repo.get_all().await?;
        let camera = repo
            .create(NewCamera {
                name: "Roof Access".to_string(),
                zone: "Zone E".to_string(),
                stream_url: "rtsp://cameras.local/stream9".to_string(),
                is_active: None,
            })
            .await?;

        assert!(camera.is_active);
        assert_eq!(
            camera.id,
            before.iter().map(|c| c.id).max().unwrap_or(0) + 1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_removes_from_active_list() -> Result<()> {
        let repo = repo();
        let active_before = repo.get_active().await?.len();
        repo.update(
            1,
            CameraUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(repo.get_active().await?.len(), active_before - 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() -> Result<()> {
        let repo = repo();
        repo.delete(2).await?;
        let err = repo.delete(2).await.unwrap_err();
        assert!(matches!(Error::find(&err), Some(Error::NotFound(_))));
        Ok(())
    }
}
