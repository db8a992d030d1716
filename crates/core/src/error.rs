//! Domain error model.
//!
//! Two layers:
//! - [`StoreError`] is what a storage backend reports at the persistence boundary.
//! - [`DomainError`] is what every service operation returns. Storage failures are
//!   wrapped (never flattened) so the original cause stays reachable via
//!   `std::error::Error::source`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Kind of entity an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Location,
    Stock,
    Lot,
    Alert,
    Batch,
    Transfer,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            EntityKind::Item => "item",
            EntityKind::Location => "location",
            EntityKind::Stock => "stock record",
            EntityKind::Lot => "lot",
            EntityKind::Alert => "alert",
            EntityKind::Batch => "batch",
            EntityKind::Transfer => "transfer intent",
        };
        f.write_str(s)
    }
}

/// Failure reported by a storage backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("{0} already exists")]
    Duplicate(EntityKind),

    /// Conditional write affected zero rows: the stored version moved on.
    #[error("version mismatch (expected {expected}, found {actual:?})")]
    VersionMismatch { expected: u64, actual: Option<u64> },

    /// Write rejected because the target is in an incompatible state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Domain-level error returned by every inventory operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, rejected before any state change.
    #[error("validation failed [{field}]: {message} (value: {value})")]
    Validation {
        field: String,
        message: String,
        value: String,
    },

    /// A business rule (e.g. the negative-stock policy) was violated.
    #[error("business rule violated [{rule}]: {message} ({context})")]
    BusinessRule {
        rule: String,
        message: String,
        context: String,
    },

    /// Optimistic concurrency check failed; re-read and retry is up to the caller.
    #[error("version mismatch on {resource}: record is no longer at version {expected}")]
    VersionMismatch { resource: String, expected: u64 },

    /// The persistence layer failed.
    #[error("storage error during {operation}")]
    Storage {
        operation: String,
        #[source]
        source: StoreError,
    },

    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("{0} already exists")]
    Duplicate(EntityKind),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("insufficient reservation: requested {requested}, reserved {reserved}")]
    InsufficientReservation { requested: i64, reserved: i64 },

    #[error("lot {0} has expired")]
    ExpiredLot(String),

    /// Not enough recorded data to compute a result (e.g. no costed receipts).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("alert {0} is not active")]
    AlertNotActive(String),
}

impl DomainError {
    pub fn validation(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: value.to_string(),
        }
    }

    pub fn business_rule(
        rule: impl Into<String>,
        message: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::BusinessRule {
            rule: rule.into(),
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn storage(operation: impl Into<String>, source: StoreError) -> Self {
        Self::Storage {
            operation: operation.into(),
            source,
        }
    }

    pub fn not_found(kind: EntityKind) -> Self {
        Self::NotFound(kind)
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    /// Map a storage failure, keeping the domain meaning of sentinel errors.
    ///
    /// `NotFound`/`Duplicate` become their domain counterparts, a version mismatch
    /// becomes [`DomainError::VersionMismatch`] on `operation`; anything else is
    /// wrapped as [`DomainError::Storage`].
    pub fn store(operation: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(kind) => Self::NotFound(kind),
            StoreError::Duplicate(kind) => Self::Duplicate(kind),
            StoreError::VersionMismatch { expected, .. } => Self::VersionMismatch {
                resource: operation.into(),
                expected,
            },
            other => Self::storage(operation, other),
        }
    }

    /// Whether re-reading and retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }
}
