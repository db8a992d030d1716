use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use stockledger_core::{
    AlertId, EntityKind, ExpectedVersion, ItemId, LocationId, LotId, StoreError, Versioned,
};
use stockledger_inventory::journal::newest_first;
use stockledger_inventory::{
    AlertStore, CatalogStore, Item, JournalEntry, JournalStore, Location, Lot, LotStore,
    NewJournalEntry, StockAlert, StockRecord, StockStore, StorageHealth,
};

use super::faults::{Fault, FaultPlan};

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    locations: BTreeMap<LocationId, Location>,
    stock: BTreeMap<(ItemId, LocationId), StockRecord>,
    journal: Vec<JournalEntry>,
    last_sequence: u64,
    lots: BTreeMap<LotId, Lot>,
    alerts: BTreeMap<AlertId, StockAlert>,
}

/// In-memory implementation of every inventory storage port.
///
/// One lock guards all tables, so a conditional stock write is checked and
/// applied atomically. Intended for tests/dev and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    closed: AtomicBool,
    faults: FaultPlan,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for tests.
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl CatalogStore for InMemoryStore {
    fn create_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.items.contains_key(&item.id) {
            return Err(StoreError::Duplicate(EntityKind::Item));
        }
        t.items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn get_item(&self, id: &ItemId) -> Result<Item, StoreError> {
        self.read()?
            .items
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Item))
    }

    fn update_item(&self, item: &Item) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let slot = t
            .items
            .get_mut(&item.id)
            .ok_or(StoreError::NotFound(EntityKind::Item))?;
        *slot = item.clone();
        Ok(())
    }

    fn delete_item(&self, id: &ItemId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.items.contains_key(id) {
            return Err(StoreError::NotFound(EntityKind::Item));
        }
        if t.stock.keys().any(|(item, _)| item == id) {
            return Err(StoreError::Conflict(format!("item {id} has stock records")));
        }
        t.items.remove(id);
        Ok(())
    }

    fn list_items(&self, offset: usize, limit: usize) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .read()?
            .items
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn create_location(&self, location: &Location) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.locations.contains_key(&location.id) {
            return Err(StoreError::Duplicate(EntityKind::Location));
        }
        t.locations.insert(location.id.clone(), location.clone());
        Ok(())
    }

    fn get_location(&self, id: &LocationId) -> Result<Location, StoreError> {
        self.read()?
            .locations
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Location))
    }

    fn update_location(&self, location: &Location) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let slot = t
            .locations
            .get_mut(&location.id)
            .ok_or(StoreError::NotFound(EntityKind::Location))?;
        *slot = location.clone();
        Ok(())
    }

    fn delete_location(&self, id: &LocationId) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.locations.contains_key(id) {
            return Err(StoreError::NotFound(EntityKind::Location));
        }
        if t.stock.keys().any(|(_, location)| location == id) {
            return Err(StoreError::Conflict(format!(
                "location {id} has stock records"
            )));
        }
        t.locations.remove(id);
        Ok(())
    }

    fn list_locations(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.read()?.locations.values().cloned().collect())
    }
}

impl StockStore for InMemoryStore {
    fn create_stock(&self, record: &StockRecord) -> Result<(), StoreError> {
        self.faults
            .trip(&Fault::StockWrite(record.location_id().clone()))?;
        let mut t = self.write()?;
        let key = record.key();
        if t.stock.contains_key(&key) {
            return Err(StoreError::Duplicate(EntityKind::Stock));
        }
        t.stock.insert(key, record.clone());
        Ok(())
    }

    fn get_stock(&self, item: &ItemId, location: &LocationId) -> Result<StockRecord, StoreError> {
        self.read()?
            .stock
            .get(&(item.clone(), location.clone()))
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Stock))
    }

    fn update_stock(
        &self,
        record: &StockRecord,
        expected: ExpectedVersion,
    ) -> Result<(), StoreError> {
        self.faults
            .trip(&Fault::StockWrite(record.location_id().clone()))?;
        let mut t = self.write()?;
        let slot = t
            .stock
            .get_mut(&record.key())
            .ok_or(StoreError::NotFound(EntityKind::Stock))?;

        let current = slot.version();
        if !expected.matches(current) {
            return Err(StoreError::VersionMismatch {
                expected: expected.exact().unwrap_or(current),
                actual: Some(current),
            });
        }
        *slot = record.clone();
        Ok(())
    }

    fn stock_by_location(&self, location: &LocationId) -> Result<Vec<StockRecord>, StoreError> {
        Ok(self
            .read()?
            .stock
            .values()
            .filter(|r| r.location_id() == location)
            .cloned()
            .collect())
    }

    fn stock_by_item(&self, item: &ItemId) -> Result<Vec<StockRecord>, StoreError> {
        Ok(self
            .read()?
            .stock
            .values()
            .filter(|r| r.item_id() == item)
            .cloned()
            .collect())
    }
}

impl JournalStore for InMemoryStore {
    fn append(&self, entry: NewJournalEntry) -> Result<JournalEntry, StoreError> {
        self.faults.trip(&Fault::JournalAppend)?;
        let mut t = self.write()?;
        t.last_sequence += 1;
        let stored = entry.sequenced(t.last_sequence);
        t.journal.push(stored.clone());
        Ok(stored)
    }

    fn history_by_item(&self, item: &ItemId, limit: usize) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries: Vec<JournalEntry> = self
            .read()?
            .journal
            .iter()
            .filter(|e| &e.item_id == item)
            .cloned()
            .collect();
        newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    fn history_by_location(
        &self,
        location: &LocationId,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries: Vec<JournalEntry> = self
            .read()?
            .journal
            .iter()
            .filter(|e| e.involves(location))
            .cloned()
            .collect();
        newest_first(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    fn history_by_date_range(
        &self,
        item: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries: Vec<JournalEntry> = self
            .read()?
            .journal
            .iter()
            .filter(|e| &e.item_id == item && e.recorded_at >= from && e.recorded_at <= to)
            .cloned()
            .collect();
        newest_first(&mut entries);
        Ok(entries)
    }

    fn history_by_tag(&self, key: &str, value: &str) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries: Vec<JournalEntry> = self
            .read()?
            .journal
            .iter()
            .filter(|e| e.metadata.get(key).is_some_and(|v| v == value))
            .cloned()
            .collect();
        newest_first(&mut entries);
        Ok(entries)
    }
}

impl LotStore for InMemoryStore {
    fn create_lot(&self, lot: &Lot) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let taken = t.lots.contains_key(&lot.id)
            || t
                .lots
                .values()
                .any(|l| l.item_id == lot.item_id && l.number == lot.number);
        if taken {
            return Err(StoreError::Duplicate(EntityKind::Lot));
        }
        t.lots.insert(lot.id, lot.clone());
        Ok(())
    }

    fn get_lot(&self, id: &LotId) -> Result<Lot, StoreError> {
        self.read()?
            .lots
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Lot))
    }

    fn lots_by_item(&self, item: &ItemId) -> Result<Vec<Lot>, StoreError> {
        Ok(self
            .read()?
            .lots
            .values()
            .filter(|l| &l.item_id == item)
            .cloned()
            .collect())
    }

    fn list_lots(&self) -> Result<Vec<Lot>, StoreError> {
        Ok(self.read()?.lots.values().cloned().collect())
    }
}

impl AlertStore for InMemoryStore {
    fn create_alert(&self, alert: &StockAlert) -> Result<(), StoreError> {
        self.faults.trip(&Fault::AlertCreate)?;
        let mut t = self.write()?;
        if t.alerts.contains_key(&alert.id) {
            return Err(StoreError::Duplicate(EntityKind::Alert));
        }
        t.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    fn get_alert(&self, id: &AlertId) -> Result<StockAlert, StoreError> {
        self.read()?
            .alerts
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(EntityKind::Alert))
    }

    fn update_alert(&self, alert: &StockAlert) -> Result<(), StoreError> {
        let mut t = self.write()?;
        let slot = t
            .alerts
            .get_mut(&alert.id)
            .ok_or(StoreError::NotFound(EntityKind::Alert))?;
        *slot = alert.clone();
        Ok(())
    }

    fn active_alerts(&self) -> Result<Vec<StockAlert>, StoreError> {
        let mut alerts: Vec<StockAlert> = self
            .read()?
            .alerts
            .values()
            .filter(|a| a.active)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        Ok(alerts)
    }
}

impl StorageHealth for InMemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        tracing::info!("in-memory store closed");
        Ok(())
    }
}
