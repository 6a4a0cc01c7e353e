use crate::db::models::{NewWorker, Worker, WorkerUpdate};
use crate::db::{MemoryStore, Operation};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Workers repository for handling worker operations
#[derive(Clone)]
pub struct WorkersRepository {
    store: Arc<MemoryStore>,
}

impl WorkersRepository {
    /// Create a new workers repository
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Get all workers
    pub async fn get_all(&self) -> Result<Vec<Worker>> {
        self.store.latency.wait(Operation::List).await;
        Ok(self.store.workers.all().await)
    }

    /// Get worker by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Worker> {
        self.store.latency.wait(Operation::Get).await;
        Ok(self.store.workers.get(id).await?)
    }

    /// Workers whose name, username, employee id or department contains `query`
    pub async fn search(&self, query: &str) -> Result<Vec<Worker>> {
        let workers = self.get_all().await?;
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Ok(workers);
        }

        Ok(workers
            .into_iter()
            .filter(|w| {
                [&w.full_name, &w.username, &w.employee_id, &w.department]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Create a new worker
    pub async fn create(&self, worker: NewWorker) -> Result<Worker> {
        self.store.latency.wait(Operation::Create).await;
        worker.validate()?;

        info!("Creating new worker: {}", worker.full_name);
        let created_at = self.store.now_utc();
        let worker = self
            .store
            .workers
            .insert_with(|id| worker.into_worker(id, created_at))
            .await;

        Ok(worker)
    }

    /// Update worker
    pub async fn update(&self, id: i64, update: WorkerUpdate) -> Result<Worker> {
        self.store.latency.wait(Operation::Update).await;
        update.validate()?;

        Ok(self
            .store
            .workers
            .update_with(id, |worker| update.apply(worker))
            .await?)
    }

    /// Delete worker.
    ///
    /// Violations keep the dangling `workerId`; joined views report the worker as absent.
    pub async fn delete(&self, id: i64) -> Result<Worker> {
        self.store.latency.wait(Operation::Delete).await;
        let worker = self.store.workers.remove(id).await?;

        let orphaned = self
            .store
            .violations
            .all()
            .await
            .iter()
            .filter(|v| v.worker_id == id)
            .count();
        if orphaned > 0 {
            warn!(
                "Deleted worker {} is still referenced by {} violations",
                id, orphaned
            );
        }

        info!("Deleted worker {}", id);
        Ok(worker)
    }
}
