//! Notifications published after a committed stock change.
//!
//! Publishing is fire-and-forget from the ledger's point of view: a failure is
//! logged and never undoes the change it describes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockledger_core::{Actor, AlertId, ItemId, LocationId, TransactionId};
use stockledger_events::Event;

use crate::alert::AlertKind;

/// Which ledger operation changed the quantity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Remove,
    Adjust,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChanged {
    pub transaction_id: TransactionId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub change: ChangeKind,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlertRaised {
    pub alert_id: AlertId,
    pub kind: AlertKind,
    pub item_id: ItemId,
    pub location_id: Option<LocationId>,
    pub current_quantity: i64,
    pub threshold: i64,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTransferred {
    pub transaction_id: TransactionId,
    pub item_id: ItemId,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub quantity: i64,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    StockChanged(StockChanged),
    LowStockAlert(LowStockAlertRaised),
    ItemTransferred(ItemTransferred),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockChanged(_) => "inventory.stock.changed",
            InventoryEvent::LowStockAlert(_) => "inventory.alert.raised",
            InventoryEvent::ItemTransferred(_) => "inventory.item.transferred",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::StockChanged(e) => e.occurred_at,
            InventoryEvent::LowStockAlert(e) => e.occurred_at,
            InventoryEvent::ItemTransferred(e) => e.occurred_at,
        }
    }

    fn subject(&self) -> String {
        match self {
            InventoryEvent::StockChanged(e) => format!("stock/{}/{}", e.item_id, e.location_id),
            InventoryEvent::LowStockAlert(e) => format!("alert/{}", e.alert_id),
            InventoryEvent::ItemTransferred(e) => format!("item/{}", e.item_id),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Unavailable(String),

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Outbound port for inventory notifications.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: InventoryEvent, actor: Actor) -> Result<(), PublishError>;
}

/// Publish if a publisher is wired, logging (not returning) any failure.
pub(crate) fn publish_quietly(
    publisher: Option<&Arc<dyn EventPublisher>>,
    event: InventoryEvent,
    actor: Actor,
) {
    let Some(publisher) = publisher else {
        return;
    };
    let event_type = event.event_type();
    let subject = event.subject();
    if let Err(error) = publisher.publish(event, actor) {
        tracing::error!(%error, event_type, %subject, "failed to publish inventory event");
    }
}
