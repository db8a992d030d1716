//! Storage backends implementing the inventory ports.

pub mod faults;
pub mod in_memory;

pub use faults::{Fault, FaultPlan};
pub use in_memory::InMemoryStore;
