//! Turnover, slow movers and CSV reports.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ItemId, LocationId, Versioned};

use crate::abc::AbcClassifier;
use crate::journal::{MovementType, TransactionJournal};
use crate::storage::{CatalogStore, StockStore};
use crate::valuation::{ValuationEngine, ValuationMethod};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "method", rename_all = "snake_case")]
pub enum ReportType {
    /// Current records at the location.
    Stock,
    /// Recent journal entries touching the location.
    Movement,
    /// Per-item values under a valuation method.
    Valuation(ValuationMethod),
    /// ABC classification.
    Abc,
}

/// Escape a CSV field if it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Start of the trailing window `period` long that ends now.
fn window_start(period: Duration) -> DomainResult<DateTime<Utc>> {
    if period <= Duration::zero() {
        return Err(DomainError::validation("period", "must be positive", period));
    }
    Utc::now()
        .checked_sub_signed(period)
        .ok_or_else(|| DomainError::validation("period", "reaches before the earliest representable time", period))
}

#[derive(Clone)]
pub struct InventoryAnalytics {
    catalog: Arc<dyn CatalogStore>,
    stocks: Arc<dyn StockStore>,
    journal: TransactionJournal,
    valuation: ValuationEngine,
    abc: AbcClassifier,
    scan_limit: usize,
}

impl InventoryAnalytics {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stocks: Arc<dyn StockStore>,
        journal: TransactionJournal,
        valuation: ValuationEngine,
        abc: AbcClassifier,
        scan_limit: usize,
    ) -> Self {
        Self {
            catalog,
            stocks,
            journal,
            valuation,
            abc,
            scan_limit: scan_limit.max(1),
        }
    }

    /// Annualised turnover: units shipped during the trailing `period`,
    /// divided by current on-hand stock, scaled to a year.
    ///
    /// Zero when nothing is on hand.
    pub fn turnover_rate(&self, item: &ItemId, period: Duration) -> DomainResult<Decimal> {
        let since = window_start(period)?;
        self.catalog
            .get_item(item)
            .map_err(|e| DomainError::store("get_item", e))?;

        let on_hand = self
            .stocks
            .total_stock(item)
            .map_err(|e| DomainError::storage("total_stock", e))?;
        if on_hand <= 0 {
            return Ok(Decimal::ZERO);
        }

        let shipped: i64 = self
            .journal
            .scan_item(item, self.scan_limit)?
            .iter()
            .filter(|e| e.movement == MovementType::Outbound && e.recorded_at >= since)
            .map(|e| e.quantity)
            .sum();

        let days = Decimal::from(period.num_milliseconds()) / Decimal::from(MILLIS_PER_DAY);
        (Decimal::from(shipped) / Decimal::from(on_hand) * Decimal::from(365))
            .checked_div(days)
            .ok_or_else(|| DomainError::validation("period", "is too short to annualise", period))
    }

    /// Items with stock at `location` that have shipped nothing from there
    /// during the trailing `period`.
    pub fn slow_moving_items(&self, location: &LocationId, period: Duration) -> DomainResult<Vec<ItemId>> {
        let since = window_start(period)?;
        let records = self
            .stocks
            .stock_by_location(location)
            .map_err(|e| DomainError::storage("stock_by_location", e))?;
        let recent = self.journal.scan_location(location, self.scan_limit)?;

        Ok(records
            .into_iter()
            .filter(|r| r.quantity() > 0)
            .filter(|r| {
                !recent.iter().any(|e| {
                    e.movement == MovementType::Outbound
                        && &e.item_id == r.item_id()
                        && e.recorded_at >= since
                })
            })
            .map(|r| r.item_id().clone())
            .collect())
    }

    /// Render a CSV report for one location.
    pub fn report(&self, location: &LocationId, report: ReportType) -> DomainResult<Vec<u8>> {
        self.catalog
            .get_location(location)
            .map_err(|e| DomainError::store("get_location", e))?;

        let mut out = String::new();
        match report {
            ReportType::Stock => {
                out.push_str("item_id,quantity,reserved,available,version,updated_at\n");
                let records = self
                    .stocks
                    .stock_by_location(location)
                    .map_err(|e| DomainError::storage("stock_by_location", e))?;
                for r in records {
                    let _ = writeln!(
                        out,
                        "{},{},{},{},{},{}",
                        r.item_id(),
                        r.quantity(),
                        r.reserved(),
                        r.available(),
                        r.version(),
                        r.updated_at().to_rfc3339()
                    );
                }
            }
            ReportType::Movement => {
                out.push_str("sequence,recorded_at,movement,item_id,from,to,quantity,unit_cost,reference\n");
                for e in self.journal.history_by_location(location, self.scan_limit)? {
                    let _ = writeln!(
                        out,
                        "{},{},{},{},{},{},{},{},{}",
                        e.sequence,
                        e.recorded_at.to_rfc3339(),
                        e.movement,
                        e.item_id,
                        e.from_location.as_ref().map(|l| l.as_str()).unwrap_or(""),
                        e.to_location.as_ref().map(|l| l.as_str()).unwrap_or(""),
                        e.quantity,
                        e.unit_cost.map(|c| c.to_string()).unwrap_or_default(),
                        csv_field(&e.reference)
                    );
                }
            }
            ReportType::Valuation(method) => {
                out.push_str("item_id,quantity,value,method\n");
                for v in self.valuation.item_values(location, method)? {
                    let _ = writeln!(
                        out,
                        "{},{},{},{}",
                        v.item_id,
                        v.quantity,
                        v.value.round_dp(2),
                        method
                    );
                }
            }
            ReportType::Abc => {
                out.push_str("item_id,annual_value,cumulative_share,class\n");
                for e in self.abc.classify_location(location)? {
                    let _ = writeln!(
                        out,
                        "{},{},{},{}",
                        e.item_id,
                        e.annual_value.round_dp(2),
                        e.cumulative_share.round_dp(4),
                        e.class
                    );
                }
            }
        }
        Ok(out.into_bytes())
    }
}
