//! Storage ports.
//!
//! The inventory services depend only on these traits. Each trait covers one
//! concern so a backend can be swapped piecemeal; [`Storage`] bundles them for
//! backends that implement everything.
//!
//! Implementations must be safe to share across threads. Reads return owned
//! copies; nothing handed out aliases stored state.

use chrono::{DateTime, Utc};

use stockledger_core::{
    AlertId, BatchId, ExpectedVersion, ItemId, LocationId, LotId, StoreError, TransferId,
};

use crate::alert::StockAlert;
use crate::batch::BatchOperation;
use crate::catalog::{Item, Location};
use crate::journal::{JournalEntry, NewJournalEntry};
use crate::lot::Lot;
use crate::stock::StockRecord;
use crate::transfer::{TransferIntent, TransferState};

pub trait CatalogStore: Send + Sync {
    /// Fails with `Duplicate(Item)` if the id is taken.
    fn create_item(&self, item: &Item) -> Result<(), StoreError>;
    fn get_item(&self, id: &ItemId) -> Result<Item, StoreError>;
    fn update_item(&self, item: &Item) -> Result<(), StoreError>;
    fn delete_item(&self, id: &ItemId) -> Result<(), StoreError>;
    /// Items ordered by id.
    fn list_items(&self, offset: usize, limit: usize) -> Result<Vec<Item>, StoreError>;

    fn create_location(&self, location: &Location) -> Result<(), StoreError>;
    fn get_location(&self, id: &LocationId) -> Result<Location, StoreError>;
    fn update_location(&self, location: &Location) -> Result<(), StoreError>;
    fn delete_location(&self, id: &LocationId) -> Result<(), StoreError>;
    fn list_locations(&self) -> Result<Vec<Location>, StoreError>;
}

pub trait StockStore: Send + Sync {
    /// Insert the first record for an (item, location) pair.
    ///
    /// Fails with `Duplicate(Stock)` if one already exists; a concurrent
    /// creator won the race.
    fn create_stock(&self, record: &StockRecord) -> Result<(), StoreError>;

    /// Fails with `NotFound(Stock)` if the pair has never held stock.
    fn get_stock(&self, item: &ItemId, location: &LocationId) -> Result<StockRecord, StoreError>;

    /// Conditional replace: succeeds only if the stored version satisfies
    /// `expected`, otherwise fails with `VersionMismatch` and changes nothing.
    fn update_stock(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// Records at a location ordered by item id.
    fn stock_by_location(&self, location: &LocationId) -> Result<Vec<StockRecord>, StoreError>;

    /// Records for an item ordered by location id.
    fn stock_by_item(&self, item: &ItemId) -> Result<Vec<StockRecord>, StoreError>;

    /// On-hand quantity of an item summed over every location.
    fn total_stock(&self, item: &ItemId) -> Result<i64, StoreError> {
        Ok(self.stock_by_item(item)?.iter().map(StockRecord::quantity).sum())
    }
}

/// Append-only journal storage.
pub trait JournalStore: Send + Sync {
    /// Append an entry, assigning the next sequence number.
    fn append(&self, entry: NewJournalEntry) -> Result<JournalEntry, StoreError>;

    /// Newest first by `(recorded_at, sequence)`, at most `limit` entries.
    fn history_by_item(&self, item: &ItemId, limit: usize) -> Result<Vec<JournalEntry>, StoreError>;

    /// Entries whose source or destination is `location`, newest first.
    fn history_by_location(
        &self,
        location: &LocationId,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, StoreError>;

    /// Entries for an item recorded in `[from, to]`, newest first.
    fn history_by_date_range(
        &self,
        item: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>, StoreError>;

    /// Every entry whose metadata maps `key` to `value`, newest first.
    fn history_by_tag(&self, key: &str, value: &str) -> Result<Vec<JournalEntry>, StoreError>;
}

pub trait LotStore: Send + Sync {
    fn create_lot(&self, lot: &Lot) -> Result<(), StoreError>;
    fn get_lot(&self, id: &LotId) -> Result<Lot, StoreError>;
    fn lots_by_item(&self, item: &ItemId) -> Result<Vec<Lot>, StoreError>;
    fn list_lots(&self) -> Result<Vec<Lot>, StoreError>;
}

pub trait AlertStore: Send + Sync {
    fn create_alert(&self, alert: &StockAlert) -> Result<(), StoreError>;
    fn get_alert(&self, id: &AlertId) -> Result<StockAlert, StoreError>;
    fn update_alert(&self, alert: &StockAlert) -> Result<(), StoreError>;
    /// Unresolved alerts, oldest first.
    fn active_alerts(&self) -> Result<Vec<StockAlert>, StoreError>;
}

pub trait StorageHealth: Send + Sync {
    fn ping(&self) -> Result<(), StoreError>;
    /// After closing, every call fails with `Unavailable`.
    fn close(&self) -> Result<(), StoreError>;
}

/// A backend implementing every inventory storage concern.
pub trait Storage:
    CatalogStore + StockStore + JournalStore + LotStore + AlertStore + StorageHealth
{
}

impl<T> Storage for T where
    T: CatalogStore + StockStore + JournalStore + LotStore + AlertStore + StorageHealth
{
}

/// Durable log of transfer intents.
pub trait TransferLog: Send + Sync {
    fn record(&self, intent: &TransferIntent) -> Result<(), StoreError>;
    fn get(&self, id: &TransferId) -> Result<TransferIntent, StoreError>;
    /// Replace an intent; fails with `Conflict` if the stored state is no
    /// longer `from`.
    fn transition(&self, intent: &TransferIntent, from: TransferState) -> Result<(), StoreError>;
    /// Intents in an unresolved state, oldest first.
    fn unresolved(&self) -> Result<Vec<TransferIntent>, StoreError>;
}

/// Persistence of batch results for later status queries.
pub trait BatchStore: Send + Sync {
    /// Insert or replace.
    fn save(&self, batch: &BatchOperation) -> Result<(), StoreError>;
    fn get(&self, id: &BatchId) -> Result<BatchOperation, StoreError>;
}
