use crate::db::models::{Camera, PpeConfig, Violation, ViolationStatus, Worker};
use crate::messaging::broker::{EventCallback, MessageBroker, MessageBrokerTrait};
use crate::messaging::{EventMessage, EventType};
use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;

/// Helper for publishing domain events after successful mutations
#[derive(Clone)]
pub struct SafetyEvents {
    message_broker: Arc<MessageBroker>,
}

impl SafetyEvents {
    pub fn new(message_broker: Arc<MessageBroker>) -> Self {
        Self { message_broker }
    }

    pub async fn worker_created(&self, worker: &Worker) -> Result<()> {
        self.message_broker
            .publish(EventType::WorkerCreated, Some(worker.id), worker)
            .await?;
        info!("Published worker created event for {}", worker.id);
        Ok(())
    }

    pub async fn worker_updated(&self, worker: &Worker) -> Result<()> {
        self.message_broker
            .publish(EventType::WorkerUpdated, Some(worker.id), worker)
            .await
    }

    pub async fn worker_deleted(&self, worker_id: i64) -> Result<()> {
        self.message_broker
            .publish(
                EventType::WorkerDeleted,
                Some(worker_id),
                serde_json::json!({ "workerId": worker_id }),
            )
            .await?;
        info!("Published worker deleted event for {}", worker_id);
        Ok(())
    }

    pub async fn camera_created(&self, camera: &Camera) -> Result<()> {
        self.message_broker
            .publish(EventType::CameraCreated, Some(camera.id), camera)
            .await?;
        info!("Published camera created event for {}", camera.id);
        Ok(())
    }

    pub async fn camera_updated(&self, camera: &Camera) -> Result<()> {
        self.message_broker
            .publish(EventType::CameraUpdated, Some(camera.id), camera)
            .await
    }

    pub async fn camera_deleted(&self, camera_id: i64, camera_name: &str) -> Result<()> {
        let payload = serde_json::json!({
            "cameraId": camera_id,
            "cameraName": camera_name,
        });

        self.message_broker
            .publish(EventType::CameraDeleted, Some(camera_id), payload)
            .await?;
        info!("Published camera deleted event for {}", camera_id);
        Ok(())
    }

    pub async fn violation_created(&self, violation: &Violation) -> Result<()> {
        self.message_broker
            .publish(EventType::ViolationCreated, Some(violation.id), violation)
            .await?;
        info!(
            "Published violation created event for {} (worker {}, camera {})",
            violation.id, violation.worker_id, violation.camera_id
        );
        Ok(())
    }

    /// Resolutions get their own event type, other edits are plain updates
    pub async fn violation_updated(
        &self,
        violation: &Violation,
        previous_status: ViolationStatus,
    ) -> Result<()> {
        let event_type = if previous_status == ViolationStatus::Pending
            && violation.status == ViolationStatus::Resolved
        {
            EventType::ViolationResolved
        } else {
            EventType::ViolationUpdated
        };

        self.message_broker
            .publish(event_type, Some(violation.id), violation)
            .await
    }

    pub async fn violation_deleted(&self, violation_id: i64) -> Result<()> {
        self.message_broker
            .publish(
                EventType::ViolationDeleted,
                Some(violation_id),
                serde_json::json!({ "violationId": violation_id }),
            )
            .await
    }

    pub async fn alert_raised(&self, violation: &Violation) -> Result<()> {
        self.message_broker
            .publish(EventType::AlertRaised, Some(violation.id), violation)
            .await
    }

    pub async fn alert_dismissed(&self, violation_id: i64) -> Result<()> {
        self.message_broker
            .publish(
                EventType::AlertDismissed,
                Some(violation_id),
                serde_json::json!({ "violationId": violation_id }),
            )
            .await
    }

    pub async fn ppe_config_updated(&self, config: &PpeConfig) -> Result<()> {
        self.message_broker
            .publish(EventType::PpeConfigUpdated, None, config)
            .await?;
        info!("Published PPE config updated event for {}", config.ppe_type);
        Ok(())
    }

    pub async fn system_settings_updated(&self) -> Result<()> {
        self.message_broker
            .publish(EventType::SystemSettingsUpdated, None, serde_json::Value::Null)
            .await
    }

    pub async fn system_startup(&self, version: &str) -> Result<()> {
        self.message_broker
            .publish(
                EventType::SystemStartup,
                None,
                serde_json::json!({ "version": version }),
            )
            .await
    }

    pub async fn system_shutdown(&self) -> Result<()> {
        self.message_broker
            .publish(EventType::SystemShutdown, None, serde_json::Value::Null)
            .await
    }

    /// Log every raised alert until the returned subscription is cancelled
    pub async fn log_alerts(&self) -> Result<String> {
        let callback: EventCallback = Arc::new(|event: EventMessage| -> Result<()> {
            let violation: Violation = serde_json::from_value(event.payload)?;
            warn!("Safety alert: {}", alert_summary(&violation));
            Ok(())
        });
        self.message_broker
            .subscribe(EventType::AlertRaised, callback)
            .await
    }

    pub async fn cancel(&self, subscription_id: &str) -> Result<()> {
        self.message_broker.unsubscribe(subscription_id).await
    }
}

/// One-line description of an alerting violation
pub fn alert_summary(violation: &Violation) -> String {
    let missing: Vec<&str> = violation.missing_ppe.iter().map(|ppe| ppe.label()).collect();
    format!(
        "violation {} by worker {} at {} (missing {})",
        violation.id,
        violation.worker_id,
        violation.location,
        missing.join(", ")
    )
}
