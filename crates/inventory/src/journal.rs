//! Append-only transaction journal.
//!
//! Every committed quantity change leaves one [`JournalEntry`]. Entries are
//! never updated or deleted; the store assigns each a monotonically increasing
//! `sequence` so entries sharing a timestamp still have a total order.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{Actor, DomainError, DomainResult, ItemId, LocationId, TransactionId};

use crate::storage::{CatalogStore, JournalStore};

/// Kind of movement a journal entry records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inbound,
    Outbound,
    Transfer,
    Adjustment,
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        };
        f.write_str(s)
    }
}

/// Free-form string annotations carried by an entry.
pub type Metadata = BTreeMap<String, String>;

/// An entry about to be appended. The store turns it into a [`JournalEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJournalEntry {
    pub id: TransactionId,
    pub movement: MovementType,
    pub item_id: ItemId,
    pub from_location: Option<LocationId>,
    pub to_location: Option<LocationId>,
    /// Units moved; for adjustments, the signed delta.
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub reference: String,
    pub lot_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Actor,
}

impl NewJournalEntry {
    fn base(
        movement: MovementType,
        item_id: ItemId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            movement,
            item_id,
            from_location: None,
            to_location: None,
            quantity,
            unit_cost: None,
            reference: reference.to_string(),
            lot_number: None,
            expiry_date: None,
            metadata: Metadata::new(),
            recorded_at: Utc::now(),
            recorded_by: actor,
        }
    }

    pub fn inbound(
        item_id: ItemId,
        to: LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        Self {
            to_location: Some(to),
            ..Self::base(MovementType::Inbound, item_id, quantity, reference, actor)
        }
    }

    pub fn outbound(
        item_id: ItemId,
        from: LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        Self {
            from_location: Some(from),
            ..Self::base(MovementType::Outbound, item_id, quantity, reference, actor)
        }
    }

    pub fn transfer(
        item_id: ItemId,
        from: LocationId,
        to: LocationId,
        quantity: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        Self {
            from_location: Some(from),
            to_location: Some(to),
            ..Self::base(MovementType::Transfer, item_id, quantity, reference, actor)
        }
    }

    /// Adjustment at `location` by the signed `delta`.
    pub fn adjustment(
        item_id: ItemId,
        location: LocationId,
        delta: i64,
        reference: &str,
        actor: Actor,
    ) -> Self {
        Self {
            to_location: Some(location),
            ..Self::base(MovementType::Adjustment, item_id, delta, reference, actor)
        }
    }

    pub fn with_unit_cost(mut self, unit_cost: Option<Decimal>) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn with_lot(mut self, lot_number: Option<String>, expiry: Option<DateTime<Utc>>) -> Self {
        self.lot_number = lot_number;
        self.expiry_date = expiry;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn with_recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = at;
        self
    }

    /// Attach the store-assigned sequence number.
    pub fn sequenced(self, sequence: u64) -> JournalEntry {
        JournalEntry {
            id: self.id,
            sequence,
            movement: self.movement,
            item_id: self.item_id,
            from_location: self.from_location,
            to_location: self.to_location,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            reference: self.reference,
            lot_number: self.lot_number,
            expiry_date: self.expiry_date,
            metadata: self.metadata,
            recorded_at: self.recorded_at,
            recorded_by: self.recorded_by,
        }
    }
}

/// A persisted, immutable journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: TransactionId,
    pub sequence: u64,
    pub movement: MovementType,
    pub item_id: ItemId,
    pub from_location: Option<LocationId>,
    pub to_location: Option<LocationId>,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub reference: String,
    pub lot_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Actor,
}

impl JournalEntry {
    /// Whether this entry touches `location` as source or destination.
    pub fn involves(&self, location: &LocationId) -> bool {
        self.from_location.as_ref() == Some(location) || self.to_location.as_ref() == Some(location)
    }

    /// A costed receipt into `location`: an inbound or transfer entry landing
    /// there with a positive unit cost. These form the FIFO/LIFO cost layers.
    pub fn is_costed_receipt_at(&self, location: &LocationId) -> bool {
        matches!(self.movement, MovementType::Inbound | MovementType::Transfer)
            && self.to_location.as_ref() == Some(location)
            && self.unit_cost.is_some_and(|c| c > Decimal::ZERO)
    }

    /// Ordering key: record time, then store sequence.
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.recorded_at, self.sequence)
    }
}

/// Sort newest first by `(recorded_at, sequence)`.
pub fn newest_first(entries: &mut [JournalEntry]) {
    entries.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
}

/// Sort oldest first by `(recorded_at, sequence)`.
pub fn oldest_first(entries: &mut [JournalEntry]) {
    entries.sort_by_key(JournalEntry::order_key);
}

/// Recording and querying of journal entries.
#[derive(Clone)]
pub struct TransactionJournal {
    entries: Arc<dyn JournalStore>,
    catalog: Arc<dyn CatalogStore>,
    default_limit: usize,
}

impl TransactionJournal {
    pub fn new(
        entries: Arc<dyn JournalStore>,
        catalog: Arc<dyn CatalogStore>,
        default_limit: usize,
    ) -> Self {
        Self {
            entries,
            catalog,
            default_limit: default_limit.max(1),
        }
    }

    /// Append an entry, returning it with its assigned sequence.
    pub fn record(&self, entry: NewJournalEntry) -> DomainResult<JournalEntry> {
        let stored = self
            .entries
            .append(entry)
            .map_err(|e| DomainError::storage("append_journal_entry", e))?;
        tracing::debug!(
            transaction_id = %stored.id,
            sequence = stored.sequence,
            movement = %stored.movement,
            item_id = %stored.item_id,
            quantity = stored.quantity,
            "journal entry recorded"
        );
        Ok(stored)
    }

    fn limit(&self, limit: usize) -> usize {
        if limit == 0 { self.default_limit } else { limit }
    }

    /// Most recent entries for an item, newest first. `limit == 0` uses the
    /// configured default.
    pub fn history_by_item(&self, item: &ItemId, limit: usize) -> DomainResult<Vec<JournalEntry>> {
        self.catalog
            .get_item(item)
            .map_err(|e| DomainError::store("get_item", e))?;
        self.entries
            .history_by_item(item, self.limit(limit))
            .map_err(|e| DomainError::storage("history_by_item", e))
    }

    /// Most recent entries moving stock into or out of a location, newest first.
    pub fn history_by_location(
        &self,
        location: &LocationId,
        limit: usize,
    ) -> DomainResult<Vec<JournalEntry>> {
        self.catalog
            .get_location(location)
            .map_err(|e| DomainError::store("get_location", e))?;
        self.entries
            .history_by_location(location, self.limit(limit))
            .map_err(|e| DomainError::storage("history_by_location", e))
    }

    /// Entries for an item recorded within `[from, to]` (inclusive), newest first.
    pub fn history_by_date_range(
        &self,
        item: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<JournalEntry>> {
        if from > to {
            return Err(DomainError::validation(
                "date_range",
                "start must not be after end",
                format!("{from}..{to}"),
            ));
        }
        self.catalog
            .get_item(item)
            .map_err(|e| DomainError::store("get_item", e))?;
        self.entries
            .history_by_date_range(item, from, to)
            .map_err(|e| DomainError::storage("history_by_date_range", e))
    }

    /// Raw access for valuation and analytics scans (no catalog checks).
    pub(crate) fn scan_item(&self, item: &ItemId, limit: usize) -> DomainResult<Vec<JournalEntry>> {
        self.entries
            .history_by_item(item, limit)
            .map_err(|e| DomainError::storage("history_by_item", e))
    }

    pub(crate) fn scan_location(
        &self,
        location: &LocationId,
        limit: usize,
    ) -> DomainResult<Vec<JournalEntry>> {
        self.entries
            .history_by_location(location, limit)
            .map_err(|e| DomainError::storage("history_by_location", e))
    }

    /// Entries tagged with `key = value`, unbounded.
    pub(crate) fn scan_tagged(&self, key: &str, value: &str) -> DomainResult<Vec<JournalEntry>> {
        self.entries
            .history_by_tag(key, value)
            .map_err(|e| DomainError::storage("history_by_tag", e))
    }
}
