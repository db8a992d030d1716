//! Notification plumbing: typed events, delivery envelopes and a pub/sub bus.
//!
//! Inventory events themselves live in `stockledger-inventory`.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
