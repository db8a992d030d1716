//! Domain building blocks shared by every stockledger crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod entity;
pub mod error;
pub mod id;
pub mod version;

pub use actor::Actor;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, EntityKind, StoreError};
pub use id::{AlertId, BatchId, ItemId, LocationId, LotId, TransactionId, TransferId, UserId};
pub use version::{ExpectedVersion, Versioned};
