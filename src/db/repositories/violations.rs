use crate::db::models::{
    violation_models::dedup_ppe, NewViolation, Violation, ViolationStatus, ViolationUpdate,
    ViolationWithWorker, Worker,
};
use crate::db::{MemoryStore, Operation};
use crate::error::Error;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Violations repository for handling violation operations
#[derive(Clone)]
pub struct ViolationsRepository {
    store: Arc<MemoryStore>,
}

/// Attach each violation's worker, `None` where the reference dangles
pub fn join_workers(violations: Vec<Violation>, workers: &[Worker]) -> Vec<ViolationWithWorker> {
    let by_id: HashMap<i64, &Worker> = workers.iter().map(|w| (w.id, w)).collect();
    violations
        .into_iter()
        .map(|violation| {
            let worker = by_id.get(&violation.worker_id).map(|w| (*w).clone());
            ViolationWithWorker { violation, worker }
        })
        .collect()
}

/// Most recent first; equal timestamps keep their stored order
pub fn sort_newest_first(violations: &mut [ViolationWithWorker]) {
    violations.sort_by(|a, b| b.violation.timestamp.cmp(&a.violation.timestamp));
}

impl ViolationsRepository {
    /// Create a new violations repository
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Raw violations in stored order
    pub async fn list(&self) -> Result<Vec<Violation>> {
        self.store.latency.wait(Operation::List).await;
        Ok(self.store.violations.all().await)
    }

    /// All violations joined with their workers, most recent first
    pub async fn get_all(&self) -> Result<Vec<ViolationWithWorker>> {
        self.store.latency.wait(Operation::List).await;
        let workers = self.store.workers.all().await;
        let mut joined = join_workers(self.store.violations.all().await, &workers);
        sort_newest_first(&mut joined);
        Ok(joined)
    }

    /// Get violation by ID, joined with its worker
    pub async fn get_by_id(&self, id: i64) -> Result<ViolationWithWorker> {
        self.store.latency.wait(Operation::Get).await;
        let violation = self.store.violations.get(id).await?;
        let worker = self.store.workers.find(violation.worker_id).await;
        Ok(ViolationWithWorker { violation, worker })
    }

    /// Record a new violation.
    ///
    /// Both foreign keys must resolve. A missing fine is priced from the PPE configuration.
    pub async fn create(&self, violation: NewViolation) -> Result<Violation> {
        self.store.latency.wait(Operation::Create).await;
        violation.validate()?;

        if !self.store.workers.contains(violation.worker_id).await {
            return Err(Error::Validation(format!(
                "workerId {} does not reference an existing worker",
                violation.worker_id
            ))
            .into());
        }
        if !self.store.cameras.contains(violation.camera_id).await {
            return Err(Error::Validation(format!(
                "cameraId {} does not reference an existing camera",
                violation.camera_id
            ))
            .into());
        }

        let missing_ppe = dedup_ppe(violation.missing_ppe);
        let fine_amount = match violation.fine_amount {
            Some(fine_amount) => fine_amount,
            None => {
                let configs = self.store.ppe_configs.read().await;
                missing_ppe
                    .iter()
                    .filter_map(|ppe| configs.get(ppe))
                    .map(|config| config.fine_amount)
                    .sum::<f64>()
            }
        };

        let now = self.store.now_utc();
        let resolved_at = (violation.status == ViolationStatus::Resolved).then_some(now);
        let created = self
            .store
            .violations
            .insert_with(|id| Violation {
                id,
                worker_id: violation.worker_id,
                camera_id: violation.camera_id,
                timestamp: violation.timestamp.unwrap_or(now),
                missing_ppe,
                status: violation.status,
                fine_amount,
                location: violation.location,
                resolved_at,
            })
            .await;

        info!(
            "Recorded violation {} for worker {} on camera {}",
            created.id, created.worker_id, created.camera_id
        );
        Ok(created)
    }

    /// Update violation
    pub async fn update(&self, id: i64, update: ViolationUpdate) -> Result<Violation> {
        self.store.latency.wait(Operation::Update).await;
        update.validate()?;

        let now = self.store.now_utc();
        Ok(self
            .store
            .violations
            .update_with(id, |violation| update.apply(violation, now))
            .await?)
    }

    /// Change only the status of a violation
    pub async fn set_status(&self, id: i64, status: ViolationStatus) -> Result<Violation> {
        self.update(
            id,
            ViolationUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Delete violation
    pub async fn delete(&self, id: i64) -> Result<Violation> {
        self.store.latency.wait(Operation::Delete).await;
        let violation = self.store.violations.remove(id).await?;
        info!("Deleted violation {}", id);
        Ok(violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PpeType;
    use crate::db::repositories::workers::WorkersRepository;
    use crate::db::{Fixtures, SimulatedLatency};
    use crate::utils::FixedClock;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        "2024-06-04T12:00:00Z".parse().unwrap()
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::from_fixtures(Fixtures::builtin().unwrap(), SimulatedLatency::disabled())
                .with_clock(Arc::new(FixedClock::at_utc(now()))),
        )
    }

    fn new_violation(worker_id: i64) -> NewViolation {
        NewViolation {
            worker_id,
            camera_id: 1,
            missing_ppe: vec![PpeType::Helmet, PpeType::Shoes, PpeType::Helmet],
            fine_amount: None,
            location: "Zone A".to_string(),
            timestamp: None,
            status: ViolationStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_get_all_sorted_newest_first() -> Result<()> {
        let repo = ViolationsRepository::new(store());
        let all = repo.get_all().await?;
        assert!(all
            .windows(2)
            .all(|pair| pair[0].violation.timestamp >= pair[1].violation.timestamp));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_prices_fine_from_config() -> Result<()> {
        let repo = ViolationsRepository::new(store());
        let created = repo.create(new_violation(1)).await?;

        assert_eq!(created.missing_ppe, vec![PpeType::Helmet, PpeType::Shoes]);
        assert_eq!(created.fine_amount, 75.0);
        assert_eq!(created.timestamp, now());
        assert!(created.resolved_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_worker() {
        let repo = ViolationsRepository::new(store());
        let err = repo.create(new_violation(404)).await.unwrap_err();
        assert!(matches!(Error::find(&err), Some(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_into_empty_store_assigns_id_one() -> Result<()> {
        let store = Arc::new(MemoryStore::empty());
        let worker = WorkersRepository::new(store.clone())
            .create(crate::db::models::NewWorker {
                full_name: "Lee Park".to_string(),
                username: "lpark".to_string(),
                employee_id: "EMP200".to_string(),
                department: "Logistics".to_string(),
                profile_image: None,
            })
            .await?;
        store
            .cameras
            .insert_with(|id| crate::db::models::Camera {
                id,
                name: "Gate".to_string(),
                zone: "Zone A".to_string(),
                is_active: true,
                stream_url: String::new(),
            })
            .await;

        let created = ViolationsRepository::new(store)
            .create(new_violation(worker.id))
            .await?;
        assert_eq!(created.id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_worker_leaves_explicit_absent_join() -> Result<()> {
        let store = store();
        let violations = ViolationsRepository::new(store.clone());
        let workers = WorkersRepository::new(store);

        let referencing = violations.list().await?[0].clone();
        workers.delete(referencing.worker_id).await?;

        let joined = violations.get_by_id(referencing.id).await?;
        assert_eq!(joined.violation, referencing);
        assert!(joined.worker.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolving_stamps_resolution_time() -> Result<()> {
        let repo = ViolationsRepository::new(store());
        let pending = repo
            .list()
            .await?
            .into_iter()
            .find(|v| v.is_pending())
            .expect("fixtures contain a pending violation");

        let resolved = repo.set_status(pending.id, ViolationStatus::Resolved).await?;
        assert_eq!(resolved.resolved_at, Some(now()));
        Ok(())
    }
}
