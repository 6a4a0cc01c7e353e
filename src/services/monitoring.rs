//! Live monitor: periodic polling of the data source into a snapshot of
//! current stats, active alerts and simulated detection overlays.
//!
//! Polls are issued on a fixed interval and early whenever a violation
//! event arrives. Each poll carries a sequence number; a poll result is
//! only applied when its number is newer than the last applied one, and
//! issuing a poll aborts the previous one if it is still running.

use crate::config::MonitorConfig;
use crate::db::models::{Camera, PpeType, Violation, ViolationWithWorker, Worker};
use crate::db::repositories::violations::{join_workers, sort_newest_first};
use crate::db::repositories::SafetyDataSource;
use crate::error::Error;
use crate::messaging::broker::EventCallback;
use crate::messaging::{EventMessage, MessageBroker, MessageBrokerTrait, SafetyEvents};
use crate::services::analytics::compliance_rate;
use crate::utils::Clock;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Number of entries in the recent violations feed
pub const RECENT_VIOLATIONS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStats {
    /// Distinct workers appearing in the violation history
    pub total_workers: usize,
    /// Pending violations
    pub active_violations: usize,
    /// 100 when no worker has a violation on record
    pub compliance_rate: u8,
    pub active_cameras: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    /// Sequence number of the poll this snapshot came from
    pub seq: u64,
    pub polled_at: DateTime<FixedOffset>,
    pub stats: LiveStats,
    pub cameras: Vec<Camera>,
    pub recent_violations: Vec<ViolationWithWorker>,
    pub active_alerts: Vec<ViolationWithWorker>,
}

/// Box position and size as percentages of the video frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Overlay slot for the `index`-th detection on a camera
    pub fn slot(index: usize) -> Self {
        let index = index as u32;
        Self {
            x: 20 + index * 30,
            y: 30 + index * 20,
            width: 15,
            height: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub violation_id: i64,
    pub worker_id: i64,
    pub worker_name: Option<String>,
    #[serde(rename = "missingPPE")]
    pub missing_ppe: Vec<PpeType>,
    pub label: String,
    pub bounding_box: BoundingBox,
}

/// Raw data fetched by one poll
#[derive(Debug, Clone)]
pub struct PollResult {
    pub polled_at: DateTime<FixedOffset>,
    pub violations: Vec<Violation>,
    pub workers: Vec<Worker>,
    pub cameras: Vec<Camera>,
}

impl PollResult {
    fn cutoff(&self, window_secs: i64) -> DateTime<Utc> {
        let polled_at = self.polled_at.with_timezone(&Utc);
        ChronoDuration::try_seconds(window_secs)
            .and_then(|window| polled_at.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Pending violations inside the alert window, dismissed ones included
    fn alerting(&self, window_secs: i64) -> impl Iterator<Item = &Violation> {
        let cutoff = self.cutoff(window_secs);
        self.violations
            .iter()
            .filter(move |v| v.is_pending() && v.timestamp >= cutoff)
    }
}

/// Headline numbers for the live view
pub fn live_stats(violations: &[Violation], cameras: &[Camera]) -> LiveStats {
    let total_workers = violations
        .iter()
        .map(|v| v.worker_id)
        .collect::<HashSet<_>>()
        .len();
    let active_violations = violations.iter().filter(|v| v.is_pending()).count();

    LiveStats {
        total_workers,
        active_violations,
        compliance_rate: compliance_rate(total_workers, active_violations).unwrap_or(100),
        active_cameras: cameras.iter().filter(|c| c.is_active).count(),
    }
}

/// Build the client-facing view of a poll
pub fn build_snapshot(
    seq: u64,
    poll: &PollResult,
    dismissed: &HashSet<i64>,
    alert_window_secs: i64,
) -> MonitorSnapshot {
    let mut recent = join_workers(poll.violations.clone(), &poll.workers);
    sort_newest_first(&mut recent);

    let alert_ids: HashSet<i64> = poll
        .alerting(alert_window_secs)
        .map(|v| v.id)
        .filter(|id| !dismissed.contains(id))
        .collect();
    let active_alerts = recent
        .iter()
        .filter(|item| alert_ids.contains(&item.violation.id))
        .cloned()
        .collect();

    recent.truncate(RECENT_VIOLATIONS_LIMIT);

    MonitorSnapshot {
        seq,
        polled_at: poll.polled_at,
        stats: live_stats(&poll.violations, &poll.cameras),
        cameras: poll.cameras.clone(),
        recent_violations: recent,
        active_alerts,
    }
}

/// Simulated detections on one camera: its violations inside the window
pub fn detections_for(poll: &PollResult, camera_id: i64, window_secs: i64) -> Vec<Detection> {
    let cutoff = poll.cutoff(window_secs);
    let mut recent: Vec<&Violation> = poll
        .violations
        .iter()
        .filter(|v| v.camera_id == camera_id && v.timestamp >= cutoff)
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    recent
        .into_iter()
        .enumerate()
        .map(|(index, violation)| Detection {
            violation_id: violation.id,
            worker_id: violation.worker_id,
            worker_name: poll
                .workers
                .iter()
                .find(|w| w.id == violation.worker_id)
                .map(|w| w.full_name.clone()),
            missing_ppe: violation.missing_ppe.clone(),
            label: violation
                .missing_ppe
                .iter()
                .map(|ppe| format!("No {}", ppe.label()))
                .collect::<Vec<_>>()
                .join(", "),
            bounding_box: BoundingBox::slot(index),
        })
        .collect()
}

#[derive(Default)]
struct MonitorState {
    applied_seq: u64,
    latest: Option<PollResult>,
    /// Alerts the operator closed
    dismissed: HashSet<i64>,
    /// Alerts already announced on the bus
    announced: HashSet<i64>,
}

/// Polls the data source and keeps the latest live snapshot
pub struct LiveMonitor {
    source: Arc<dyn SafetyDataSource>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    message_broker: Option<Arc<MessageBroker>>,
    events: Option<SafetyEvents>,
    state: RwLock<MonitorState>,
    issued_seq: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    /// Signalled by the violation event subscription
    wake: Arc<Notify>,
    subscription: Mutex<Option<String>>,
    shutdown: CancellationToken,
}

impl LiveMonitor {
    pub fn new(
        source: Arc<dyn SafetyDataSource>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            clock,
            config,
            message_broker: None,
            events: None,
            state: RwLock::new(MonitorState::default()),
            issued_seq: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            wake: Arc::new(Notify::new()),
            subscription: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Refresh early on violation events and announce new alerts on `broker`
    pub fn with_message_broker(mut self, broker: Arc<MessageBroker>) -> Self {
        self.events = Some(SafetyEvents::new(broker.clone()));
        self.message_broker = Some(broker);
        self
    }

    /// Start the polling loop in the background
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!(
            "Starting live monitor with poll interval of {} seconds",
            self.config.poll_interval_secs
        );

        if let Some(broker) = &self.message_broker {
            let wake = self.wake.clone();
            let callback: EventCallback = Arc::new(move |event: EventMessage| -> Result<()> {
                debug!("Violation event {} received, refreshing live monitor", event.routing_key());
                wake.notify_one();
                Ok(())
            });
            let subscription_id = broker.subscribe_pattern("violation.#", callback).await?;
            *self.subscription.lock().await = Some(subscription_id);
        }

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = ticker.tick() => self.issue_poll().await,
                    _ = self.wake.notified() => self.issue_poll().await,
                }
            }

            info!("Live monitor stopped");
        });

        Ok(())
    }

    /// Stop polling and abort any poll in flight
    pub async fn shutdown(&self) {
        info!("Shutting down live monitor");
        self.shutdown.cancel();
        let subscription = self.subscription.lock().await.take();
        if let (Some(broker), Some(subscription_id)) = (&self.message_broker, subscription) {
            if let Err(e) = broker.unsubscribe(&subscription_id).await {
                warn!("Failed to unsubscribe live monitor: {}", e);
            }
        }
        if let Some(handle) = self.in_flight.lock().await.take() {
            handle.abort();
        }
    }

    /// Reserve the next poll sequence number
    pub fn next_seq(&self) -> u64 {
        self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a poll in the background, superseding the one in flight
    pub async fn issue_poll(self: &Arc<Self>) {
        let seq = self.next_seq();
        let this = Arc::clone(self);

        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            if !previous.is_finished() {
                debug!("Aborting superseded poll before issuing poll {}", seq);
                previous.abort();
            }
        }

        *in_flight = Some(tokio::spawn(async move {
            match this.fetch().await {
                Ok(poll) => {
                    this.apply(seq, poll).await;
                }
                Err(e) => error!("Live monitor poll {} failed: {}", seq, e),
            }
        }));
    }

    /// Poll synchronously and return the resulting snapshot
    pub async fn refresh(&self) -> Result<MonitorSnapshot> {
        let seq = self.next_seq();
        let poll = self.fetch().await?;
        self.apply(seq, poll).await;
        self.snapshot()
            .await
            .ok_or_else(|| Error::Internal("Live monitor has no snapshot".to_string()).into())
    }

    /// Fetch everything the live view needs
    pub async fn fetch(&self) -> Result<PollResult> {
        let (violations, workers, cameras) = tokio::try_join!(
            self.source.list_violations(),
            self.source.list_workers(),
            self.source.list_cameras()
        )?;

        Ok(PollResult {
            polled_at: self.clock.now(),
            violations,
            workers,
            cameras,
        })
    }

    /// Apply a poll result unless a newer one has already been applied
    pub async fn apply(&self, seq: u64, poll: PollResult) -> bool {
        let fresh_alerts: Vec<Violation> = {
            let mut state = self.state.write().await;
            if seq <= state.applied_seq {
                debug!(
                    "Discarding stale poll {} (already applied {})",
                    seq, state.applied_seq
                );
                return false;
            }

            let alerting: Vec<Violation> = poll
                .alerting(self.config.alert_window_secs)
                .cloned()
                .collect();
            let alerting_ids: HashSet<i64> = alerting.iter().map(|v| v.id).collect();

            // alerts that aged out can no longer be dismissed or announced
            state.dismissed.retain(|id| alerting_ids.contains(id));
            let fresh = alerting
                .into_iter()
                .filter(|v| !state.announced.contains(&v.id) && !state.dismissed.contains(&v.id))
                .collect();
            state.announced = alerting_ids;

            state.applied_seq = seq;
            state.latest = Some(poll);
            fresh
        };

        debug!("Applied poll {}", seq);

        if let Some(events) = &self.events {
            for violation in &fresh_alerts {
                if let Err(e) = events.alert_raised(violation).await {
                    warn!("Failed to publish alert for violation {}: {}", violation.id, e);
                }
            }
        }

        true
    }

    /// Latest applied snapshot, `None` before the first poll completes
    pub async fn snapshot(&self) -> Option<MonitorSnapshot> {
        let state = self.state.read().await;
        state.latest.as_ref().map(|poll| {
            build_snapshot(
                state.applied_seq,
                poll,
                &state.dismissed,
                self.config.alert_window_secs,
            )
        })
    }

    /// Detection overlays for one camera from the latest snapshot
    pub async fn detections(&self, camera_id: i64) -> Result<Vec<Detection>> {
        let state = self.state.read().await;
        let poll = match &state.latest {
            Some(poll) => poll,
            None => return Ok(Vec::new()),
        };

        if !poll.cameras.iter().any(|c| c.id == camera_id) {
            return Err(Error::NotFound(format!("Camera not found: {}", camera_id)).into());
        }

        Ok(detections_for(
            poll,
            camera_id,
            self.config.detection_window_secs,
        ))
    }

    /// Close an active alert until it ages out of the alert window
    pub async fn dismiss_alert(&self, violation_id: i64) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let active = state.latest.as_ref().map_or(false, |poll| {
                poll.alerting(self.config.alert_window_secs)
                    .any(|v| v.id == violation_id)
            });
            if !active || state.dismissed.contains(&violation_id) {
                return Err(Error::NotFound(format!("Alert not found: {}", violation_id)).into());
            }
            state.dismissed.insert(violation_id);
        }

        info!("Dismissed alert for violation {}", violation_id);
        if let Some(events) = &self.events {
            if let Err(e) = events.alert_dismissed(violation_id).await {
                warn!("Failed to publish alert dismissal for {}: {}", violation_id, e);
            }
        }
        Ok(())
    }
}
