use crate::error::Error;
use crate::messaging::event::{topic_matches, EventMessage, EventType};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Callback function type for event handling
pub type EventCallback = Arc<dyn Fn(EventMessage) -> Result<()> + Send + Sync>;

/// Message broker service trait
#[async_trait]
pub trait MessageBrokerTrait: Send + Sync {
    /// Publish an event
    async fn publish<T: Serialize + Send>(
        &self,
        event_type: EventType,
        source_id: Option<i64>,
        payload: T,
    ) -> Result<()>;

    /// Subscribe to an event type
    async fn subscribe(&self, event_type: EventType, callback: EventCallback) -> Result<String>;

    /// Subscribe to a specific routing pattern
    async fn subscribe_pattern(&self, pattern: &str, callback: EventCallback) -> Result<String>;

    /// Unsubscribe from a subscription
    async fn unsubscribe(&self, subscription_id: &str) -> Result<()>;
}

/// In-process topic broker over a tokio broadcast channel
pub struct MessageBroker {
    sender: broadcast::Sender<EventMessage>,
    /// Subscriptions map
    subscriptions: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
}

impl MessageBroker {
    /// Create a broker buffering up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Raw receiver of every event published from now on
    #[cfg(test)]
    pub(crate) fn receiver(&self) -> broadcast::Receiver<EventMessage> {
        self.sender.subscribe()
    }

    /// Send an already built event
    pub fn send(&self, event: EventMessage) {
        let routing_key = event.routing_key();
        match self.sender.send(event) {
            Ok(receivers) => debug!(
                "Published event with routing key: {} to {} receivers",
                routing_key, receivers
            ),
            Err(_) => debug!("No receivers for event with routing key: {}", routing_key),
        }
    }

    /// Start a consumer task for the given routing pattern and callback
    async fn start_consumer(&self, pattern: &str, callback: EventCallback) -> Result<String> {
        // subscribe before spawning so nothing published after this call is missed
        let mut receiver = self.sender.subscribe();

        let subscription_id = Uuid::new_v4().to_string();
        let subscription_id_clone = subscription_id.clone();
        let pattern_owned = pattern.to_string();

        let handle = tokio::spawn(async move {
            info!(
                "Started consumer for pattern: {} (subscription: {})",
                pattern_owned, subscription_id_clone
            );

            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if !topic_matches(&pattern_owned, &event.routing_key()) {
                            continue;
                        }
                        debug!("Received event: {} ({})", event.event_type, event.id);
                        if let Err(e) = callback(event) {
                            error!("Error processing event: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "Consumer for pattern {} lagged, {} events dropped",
                            pattern_owned, skipped
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            info!(
                "Consumer stopped for pattern: {} (subscription: {})",
                pattern_owned, subscription_id_clone
            );
        });

        self.subscriptions
            .write()
            .await
            .insert(subscription_id.clone(), handle);

        Ok(subscription_id)
    }
}

#[async_trait]
impl MessageBrokerTrait for MessageBroker {
    async fn publish<T: Serialize + Send>(
        &self,
        event_type: EventType,
        source_id: Option<i64>,
        payload: T,
    ) -> Result<()> {
        let event = EventMessage::new(event_type, source_id, payload)
            .map_err(|e| Error::Serialization(format!("Failed to encode event payload: {}", e)))?;
        self.send(event);
        Ok(())
    }

    async fn subscribe(&self, event_type: EventType, callback: EventCallback) -> Result<String> {
        // the trailing record id is optional
        let pattern = format!("{}.#", event_type);
        self.start_consumer(&pattern, callback).await
    }

    async fn subscribe_pattern(&self, pattern: &str, callback: EventCallback) -> Result<String> {
        self.start_consumer(pattern, callback).await
    }

    async fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;

        if let Some(handle) = subscriptions.remove(subscription_id) {
            handle.abort();
            info!("Unsubscribed: {}", subscription_id);
            Ok(())
        } else {
            Err(Error::NotFound(format!("Subscription not found: {}", subscription_id)).into())
        }
    }
}

/// Create a message broker service
pub fn create_message_broker(capacity: usize) -> Arc<MessageBroker> {
    Arc::new(MessageBroker::new(capacity))
}
