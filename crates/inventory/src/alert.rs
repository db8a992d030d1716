//! Low-stock and lot-expiry alerts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    Actor, AlertId, DomainError, DomainResult, Entity, ItemId, LocationId, LotId,
};

use crate::events::{EventPublisher, InventoryEvent, LowStockAlertRaised, publish_quietly};
use crate::stock::StockRecord;
use crate::storage::{AlertStore, LotStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    Expiring,
    Expired,
    /// Stock above what the location is expected to hold.
    Overstock,
    /// Counted stock disagrees with the ledger.
    Discrepancy,
}

/// An alert raised against an item, at a location or (for lots) item-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub item_id: ItemId,
    /// `None` for lot-wide alerts.
    pub location_id: Option<LocationId>,
    pub lot_id: Option<LotId>,
    /// Quantity observed when the alert was raised.
    pub current_quantity: i64,
    /// Low-stock threshold, or days until expiry for lot alerts.
    pub threshold: i64,
    pub message: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockAlert {
    pub fn low_stock(record: &StockRecord, threshold: i64, at: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(),
            kind: AlertKind::LowStock,
            item_id: record.item_id().clone(),
            location_id: Some(record.location_id().clone()),
            lot_id: None,
            current_quantity: record.quantity(),
            threshold,
            message: format!(
                "stock for item {} at {} is {} (threshold {})",
                record.item_id(),
                record.location_id(),
                record.quantity(),
                threshold
            ),
            active: true,
            created_at: at,
            resolved_at: None,
        }
    }

    /// Resolved copy of this alert. Fails if it is already resolved.
    pub fn resolved(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        if !self.active {
            return Err(DomainError::AlertNotActive(self.id.to_string()));
        }
        Ok(Self {
            active: false,
            resolved_at: Some(at),
            ..self.clone()
        })
    }

    /// Whether this alert applies to `location`; lot-wide alerts apply everywhere.
    pub fn applies_to(&self, location: Option<&LocationId>) -> bool {
        match (location, &self.location_id) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(own)) => wanted == own,
        }
    }
}

impl Entity for StockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Raises, lists and resolves alerts.
#[derive(Clone)]
pub struct AlertEngine {
    alerts: Arc<dyn AlertStore>,
    lots: Arc<dyn LotStore>,
    publisher: Option<Arc<dyn EventPublisher>>,
    low_stock_threshold: i64,
}

impl AlertEngine {
    pub fn new(alerts: Arc<dyn AlertStore>, lots: Arc<dyn LotStore>, low_stock_threshold: i64) -> Self {
        Self {
            alerts,
            lots,
            publisher: None,
            low_stock_threshold,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    /// Raise a low-stock alert if `record` is at or below the threshold.
    ///
    /// Called after a removal has committed: failures are logged and yield
    /// `None` instead of an error.
    pub fn check_low_stock(&self, record: &StockRecord, actor: Actor) -> Option<StockAlert> {
        if record.quantity() > self.low_stock_threshold {
            return None;
        }
        let alert = StockAlert::low_stock(record, self.low_stock_threshold, Utc::now());
        if let Err(error) = self.alerts.create_alert(&alert) {
            tracing::error!(
                %error,
                item_id = %record.item_id(),
                location_id = %record.location_id(),
                "failed to store low stock alert"
            );
            return None;
        }
        tracing::warn!(
            alert_id = %alert.id,
            item_id = %alert.item_id,
            location_id = %record.location_id(),
            quantity = alert.current_quantity,
            threshold = alert.threshold,
            "low stock"
        );
        self.publish(&alert, actor);
        Some(alert)
    }

    /// Raise an expiry alert for a lot. A negative `days_until_expiry` means
    /// the lot is already past its expiry date and yields an `Expired` alert.
    pub fn raise_expiry_alert(
        &self,
        lot_id: &LotId,
        days_until_expiry: i64,
        actor: Actor,
    ) -> DomainResult<StockAlert> {
        let lot = self
            .lots
            .get_lot(lot_id)
            .map_err(|e| DomainError::store("get_lot", e))?;
        if lot.expiry_date.is_none() {
            return Err(DomainError::business_rule(
                "lot_expiry",
                "lot has no expiry date",
                lot.number.clone(),
            ));
        }

        let (kind, message) = if days_until_expiry < 0 {
            (
                AlertKind::Expired,
                format!("lot {} expired {} days ago", lot.number, -days_until_expiry),
            )
        } else {
            (
                AlertKind::Expiring,
                format!("lot {} expires in {} days", lot.number, days_until_expiry),
            )
        };

        let alert = StockAlert {
            id: AlertId::new(),
            kind,
            item_id: lot.item_id.clone(),
            location_id: None,
            lot_id: Some(lot.id),
            current_quantity: lot.quantity,
            threshold: days_until_expiry,
            message,
            active: true,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.alerts
            .create_alert(&alert)
            .map_err(|e| DomainError::storage("create_alert", e))?;
        tracing::warn!(alert_id = %alert.id, lot = %lot.number, days_until_expiry, "lot expiry alert");
        self.publish(&alert, actor);
        Ok(alert)
    }

    /// Active alerts, optionally restricted to one location. Lot-wide alerts
    /// are always included.
    pub fn active_alerts(&self, location: Option<&LocationId>) -> DomainResult<Vec<StockAlert>> {
        let alerts = self
            .alerts
            .active_alerts()
            .map_err(|e| DomainError::storage("active_alerts", e))?;
        Ok(alerts.into_iter().filter(|a| a.applies_to(location)).collect())
    }

    pub fn resolve(&self, id: &AlertId) -> DomainResult<StockAlert> {
        let alert = self
            .alerts
            .get_alert(id)
            .map_err(|e| DomainError::store("get_alert", e))?;
        let resolved = alert.resolved(Utc::now())?;
        self.alerts
            .update_alert(&resolved)
            .map_err(|e| DomainError::store("update_alert", e))?;
        tracing::info!(alert_id = %id, "alert resolved");
        Ok(resolved)
    }

    fn publish(&self, alert: &StockAlert, actor: Actor) {
        let event = InventoryEvent::LowStockAlert(LowStockAlertRaised {
            alert_id: alert.id,
            kind: alert.kind,
            item_id: alert.item_id.clone(),
            location_id: alert.location_id.clone(),
            current_quantity: alert.current_quantity,
            threshold: alert.threshold,
            message: alert.message.clone(),
            occurred_at: alert.created_at,
        });
        publish_quietly(self.publisher.as_ref(), event, actor);
    }
}
