//! Infrastructure layer: storage backends, event publishing and service wiring.

pub mod batch_store;
pub mod publisher;
pub mod services;
pub mod store;
pub mod transfer_log;

mod integration_tests;

pub use batch_store::InMemoryBatchStore;
pub use publisher::{BusPublisher, InventoryBus};
pub use services::InventoryServices;
pub use store::{Fault, FaultPlan, InMemoryStore};
pub use transfer_log::InMemoryTransferLog;
