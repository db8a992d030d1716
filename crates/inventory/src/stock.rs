//! Stock records and their pure state transitions.
//!
//! A [`StockRecord`] is the quantity of one item at one location. Transitions
//! never mutate in place: each returns the next record with its version bumped
//! by one, ready to be written with a compare-and-swap on the previous version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Actor, DomainError, DomainResult, ItemId, LocationId, Versioned};

/// Quantity of one item held at one location.
///
/// Invariants: `available == quantity - reserved` and `reserved >= 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    item_id: ItemId,
    location_id: LocationId,
    quantity: i64,
    reserved: i64,
    available: i64,
    version: u64,
    updated_at: DateTime<Utc>,
    updated_by: Actor,
}

impl StockRecord {
    /// First record for an (item, location) pair, at version 1.
    pub fn open(
        item_id: ItemId,
        location_id: LocationId,
        quantity: i64,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            location_id,
            quantity,
            reserved: 0,
            available: quantity,
            version: 1,
            updated_at: at,
            updated_by: actor,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn location_id(&self) -> &LocationId {
        &self.location_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn updated_by(&self) -> Actor {
        self.updated_by
    }

    /// Human-readable key used in errors and logs, e.g. `stock A@L1`.
    pub fn describe(&self) -> String {
        describe(&self.item_id, &self.location_id)
    }

    fn next(&self, quantity: i64, reserved: i64, actor: Actor, at: DateTime<Utc>) -> Self {
        Self {
            item_id: self.item_id.clone(),
            location_id: self.location_id.clone(),
            quantity,
            reserved,
            available: quantity - reserved,
            version: self.version + 1,
            updated_at: at,
            updated_by: actor,
        }
    }

    /// Receive `quantity` units.
    pub fn credited(&self, quantity: i64, actor: Actor, at: DateTime<Utc>) -> DomainResult<Self> {
        let total = self.quantity.checked_add(quantity).ok_or_else(|| {
            DomainError::validation("quantity", "stock quantity would overflow", quantity)
        })?;
        Ok(self.next(total, self.reserved, actor, at))
    }

    /// Take `quantity` units out of the available (unreserved) stock.
    ///
    /// Fails with `InsufficientStock` when fewer than `quantity` are available,
    /// and with the `negative_stock` rule when the result would drop below zero
    /// and `allow_negative` is off.
    pub fn debited(
        &self,
        quantity: i64,
        allow_negative: bool,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if self.available < quantity {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: self.available,
            });
        }
        let remaining = self.quantity - quantity;
        if remaining < 0 && !allow_negative {
            return Err(DomainError::business_rule(
                "negative_stock",
                "stock would become negative",
                format!("{}: {} - {}", self.describe(), self.quantity, quantity),
            ));
        }
        Ok(self.next(remaining, self.reserved, actor, at))
    }

    /// Set the on-hand quantity outright. Reservations are kept as-is, so
    /// `available` may go negative when adjusting below the reserved amount.
    pub fn adjusted(&self, new_quantity: i64, actor: Actor, at: DateTime<Utc>) -> Self {
        self.next(new_quantity, self.reserved, actor, at)
    }

    pub fn reserve(&self, quantity: i64, actor: Actor, at: DateTime<Utc>) -> DomainResult<Self> {
        if quantity > self.available {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: self.available,
            });
        }
        Ok(self.next(self.quantity, self.reserved + quantity, actor, at))
    }

    pub fn release(&self, quantity: i64, actor: Actor, at: DateTime<Utc>) -> DomainResult<Self> {
        if quantity > self.reserved {
            return Err(DomainError::InsufficientReservation {
                requested: quantity,
                reserved: self.reserved,
            });
        }
        Ok(self.next(self.quantity, self.reserved - quantity, actor, at))
    }
}

impl Versioned for StockRecord {
    type Key = (ItemId, LocationId);

    fn key(&self) -> Self::Key {
        (self.item_id.clone(), self.location_id.clone())
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn describe(item: &ItemId, location: &LocationId) -> String {
    format!("stock {item}@{location}")
}
