pub mod broker;
pub mod event;
pub mod safety_events;

pub use broker::{MessageBroker, MessageBrokerTrait};
pub use event::{EventMessage, EventType};
pub use safety_events::SafetyEvents;
