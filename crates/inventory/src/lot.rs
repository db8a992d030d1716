//! Lot (batch-of-goods) tracking with expiry dates.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{
    Actor, DomainError, DomainResult, Entity, ItemId, LocationId, LotId,
};

use crate::journal::{JournalEntry, Metadata, NewJournalEntry, TransactionJournal, oldest_first};
use crate::storage::{CatalogStore, LotStore};
use crate::validation;

/// A received lot of one item, optionally expiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub number: String,
    pub item_id: ItemId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Lot {
    pub fn new(number: impl Into<String>, item_id: ItemId, quantity: i64, unit_cost: Decimal) -> Self {
        Self {
            id: LotId::new(),
            number: number.into(),
            item_id,
            quantity,
            unit_cost,
            expiry_date: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validation::lot_number(&self.number)?;
        validation::positive_quantity(self.quantity)?;
        validation::unit_cost(self.unit_cost)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|d| d <= now)
    }

    /// Not yet expired, but expiring no later than `now + within`.
    pub fn is_expiring_within(&self, now: DateTime<Utc>, within: Duration) -> bool {
        self.expiry_date
            .is_some_and(|d| d > now && d <= now + within)
    }

    /// Whole days until expiry (negative once past), if the lot expires.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiry_date.map(|d| (d - now).num_days())
    }
}

impl Entity for Lot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Movement of a lot recorded through [`LotTracker::track_movement`].
#[derive(Debug, Clone)]
pub struct LotMovement {
    pub item_id: ItemId,
    pub lot_number: String,
    pub from_location: Option<LocationId>,
    pub to_location: Option<LocationId>,
    pub quantity: i64,
    pub reference: String,
}

/// Journal entries and lots for one item over a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotAuditTrail {
    pub item_id: ItemId,
    pub entries: Vec<JournalEntry>,
    pub lots: Vec<Lot>,
}

/// Lot registry plus lot-aware journal queries.
#[derive(Clone)]
pub struct LotTracker {
    lots: Arc<dyn LotStore>,
    catalog: Arc<dyn CatalogStore>,
    journal: TransactionJournal,
    scan_limit: usize,
}

impl LotTracker {
    pub fn new(
        lots: Arc<dyn LotStore>,
        catalog: Arc<dyn CatalogStore>,
        journal: TransactionJournal,
        scan_limit: usize,
    ) -> Self {
        Self {
            lots,
            catalog,
            journal,
            scan_limit: scan_limit.max(1),
        }
    }

    pub fn create_lot(&self, lot: Lot) -> DomainResult<Lot> {
        lot.validate()?;
        self.catalog
            .get_item(&lot.item_id)
            .map_err(|e| DomainError::store("get_item", e))?;
        self.lots
            .create_lot(&lot)
            .map_err(|e| DomainError::store("create_lot", e))?;
        tracing::info!(lot_id = %lot.id, lot = %lot.number, item_id = %lot.item_id, "lot created");
        Ok(lot)
    }

    pub fn get_lot(&self, id: &LotId) -> DomainResult<Lot> {
        self.lots
            .get_lot(id)
            .map_err(|e| DomainError::store("get_lot", e))
    }

    pub fn lots_for_item(&self, item: &ItemId) -> DomainResult<Vec<Lot>> {
        self.lots
            .lots_by_item(item)
            .map_err(|e| DomainError::storage("lots_by_item", e))
    }

    /// Lots that have not expired yet but will within `within`, soonest first.
    pub fn expiring_lots(&self, within: Duration) -> DomainResult<Vec<Lot>> {
        let now = Utc::now();
        let mut lots: Vec<Lot> = self
            .all_lots()?
            .into_iter()
            .filter(|l| l.is_expiring_within(now, within))
            .collect();
        lots.sort_by_key(|l| l.expiry_date);
        Ok(lots)
    }

    pub fn expired_lots(&self) -> DomainResult<Vec<Lot>> {
        let now = Utc::now();
        let mut lots: Vec<Lot> = self
            .all_lots()?
            .into_iter()
            .filter(|l| l.is_expired_at(now))
            .collect();
        lots.sort_by_key(|l| l.expiry_date);
        Ok(lots)
    }

    /// Reject use of an expired lot.
    pub fn validate_lot_expiry(&self, id: &LotId) -> DomainResult<Lot> {
        let lot = self.get_lot(id)?;
        if lot.is_expired_at(Utc::now()) {
            return Err(DomainError::ExpiredLot(lot.number));
        }
        Ok(lot)
    }

    /// Journal a lot movement, tagged `lot_tracking=enabled`.
    pub fn track_movement(&self, movement: LotMovement, actor: Actor) -> DomainResult<JournalEntry> {
        validation::positive_quantity(movement.quantity)?;
        validation::lot_number(&movement.lot_number)?;
        validation::reference(&movement.reference)?;

        let entry = match (movement.from_location, movement.to_location) {
            (Some(from), Some(to)) => NewJournalEntry::transfer(
                movement.item_id,
                from,
                to,
                movement.quantity,
                &movement.reference,
                actor,
            ),
            (None, Some(to)) => NewJournalEntry::inbound(
                movement.item_id,
                to,
                movement.quantity,
                &movement.reference,
                actor,
            ),
            (Some(from), None) => NewJournalEntry::outbound(
                movement.item_id,
                from,
                movement.quantity,
                &movement.reference,
                actor,
            ),
            (None, None) => {
                return Err(DomainError::validation(
                    "location",
                    "a lot movement needs a source or destination",
                    "none",
                ));
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert("lot_tracking".to_string(), "enabled".to_string());
        self.journal
            .record(entry.with_lot(Some(movement.lot_number), None).with_metadata(metadata))
    }

    /// Everything recorded for an item in `[from, to]`, with its lots.
    pub fn audit_trail(
        &self,
        item: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<LotAuditTrail> {
        let entries = self.journal.history_by_date_range(item, from, to)?;
        let lots = self.lots_for_item(item)?;
        Ok(LotAuditTrail {
            item_id: item.clone(),
            entries,
            lots,
        })
    }

    /// Journal entries carrying `lot_number`, oldest first.
    pub fn lot_history(&self, item: &ItemId, lot_number: &str) -> DomainResult<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = self
            .journal
            .history_by_item(item, self.scan_limit)?
            .into_iter()
            .filter(|e| e.lot_number.as_deref() == Some(lot_number))
            .collect();
        oldest_first(&mut entries);
        Ok(entries)
    }

    fn all_lots(&self) -> DomainResult<Vec<Lot>> {
        self.lots
            .list_lots()
            .map_err(|e| DomainError::storage("list_lots", e))
    }
}
