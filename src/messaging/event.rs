use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Event types supported by the system
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    // Worker events
    WorkerCreated,
    WorkerUpdated,
    WorkerDeleted,

    // Camera events
    CameraCreated,
    CameraUpdated,
    CameraDeleted,

    // Violation events
    ViolationCreated,
    ViolationUpdated,
    ViolationResolved,
    ViolationDeleted,

    // Live monitor events
    AlertRaised,
    AlertDismissed,

    // Settings events
    PpeConfigUpdated,
    SystemSettingsUpdated,

    // System events
    SystemStartup,
    SystemShutdown,
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WorkerCreated => write!(f, "worker.created"),
            Self::WorkerUpdated => write!(f, "worker.updated"),
            Self::WorkerDeleted => write!(f, "worker.deleted"),
            Self::CameraCreated => write!(f, "camera.created"),
            Self::CameraUpdated => write!(f, "camera.updated"),
            Self::CameraDeleted => write!(f, "camera.deleted"),
            Self::ViolationCreated => write!(f, "violation.created"),
            Self::ViolationUpdated => write!(f, "violation.updated"),
            Self::ViolationResolved => write!(f, "violation.resolved"),
            Self::ViolationDeleted => write!(f, "violation.deleted"),
            Self::AlertRaised => write!(f, "monitor.alert_raised"),
            Self::AlertDismissed => write!(f, "monitor.alert_dismissed"),
            Self::PpeConfigUpdated => write!(f, "settings.ppe_updated"),
            Self::SystemSettingsUpdated => write!(f, "settings.system_updated"),
            Self::SystemStartup => write!(f, "system.startup"),
            Self::SystemShutdown => write!(f, "system.shutdown"),
        }
    }
}

/// Event message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    /// Unique event ID
    pub id: Uuid,
    /// Event type
    pub event_type: EventType,
    /// Record the event is about (worker, camera or violation id)
    pub source_id: Option<i64>,
    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event data payload
    pub payload: serde_json::Value,
}

impl EventMessage {
    /// Create a new event message
    pub fn new<T: Serialize>(
        event_type: EventType,
        source_id: Option<i64>,
        payload: T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_type,
            source_id,
            timestamp: chrono::Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Get the routing key for the event
    pub fn routing_key(&self) -> String {
        match &self.source_id {
            Some(id) => format!("{}.{}", self.event_type, id),
            None => self.event_type.to_string(),
        }
    }
}

/// Match a routing key against a topic pattern.
///
/// Words are dot separated; `*` matches exactly one word, `#` zero or more.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((word, rest)) => match key.split_first() {
            Some((head, tail)) => (*word == "*" || word == head) && match_words(rest, tail),
            None => false,
        },
    }
}
