//! Event publishing over an [`EventBus`].

use stockledger_core::Actor;
use stockledger_events::{EventBus, EventEnvelope, InMemoryEventBus};
use stockledger_inventory::{EventPublisher, InventoryEvent, PublishError};

/// In-process bus carrying inventory notifications.
pub type InventoryBus = InMemoryEventBus<EventEnvelope<InventoryEvent>>;

/// Wraps each inventory event in an envelope stamped with the acting
/// principal and hands it to the bus.
#[derive(Debug)]
pub struct BusPublisher<B> {
    bus: B,
}

impl<B> BusPublisher<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> EventPublisher for BusPublisher<B>
where
    B: EventBus<EventEnvelope<InventoryEvent>>,
{
    fn publish(&self, event: InventoryEvent, actor: Actor) -> Result<(), PublishError> {
        self.bus
            .publish(EventEnvelope::wrap(event, actor))
            .map_err(|e| PublishError::Unavailable(e.to_string()))
    }
}
