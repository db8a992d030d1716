//! Inventory valuation: FIFO, LIFO, weighted average and standard cost.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ItemId, LocationId};

use crate::journal::{JournalEntry, MovementType, TransactionJournal, oldest_first};
use crate::stock::StockRecord;
use crate::storage::{CatalogStore, StockStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationMethod {
    #[serde(rename = "FIFO")]
    Fifo,
    #[serde(rename = "LIFO")]
    Lifo,
    #[serde(rename = "AVERAGE")]
    WeightedAverage,
    #[serde(rename = "STANDARD")]
    Standard,
}

impl core::fmt::Display for ValuationMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ValuationMethod::Fifo => "FIFO",
            ValuationMethod::Lifo => "LIFO",
            ValuationMethod::WeightedAverage => "AVERAGE",
            ValuationMethod::Standard => "STANDARD",
        };
        f.write_str(s)
    }
}

impl core::str::FromStr for ValuationMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIFO" => Ok(ValuationMethod::Fifo),
            "LIFO" => Ok(ValuationMethod::Lifo),
            "AVERAGE" | "WEIGHTED_AVERAGE" => Ok(ValuationMethod::WeightedAverage),
            "STANDARD" => Ok(ValuationMethod::Standard),
            _ => Err(DomainError::validation(
                "valuation_method",
                "must be one of FIFO, LIFO, AVERAGE, STANDARD",
                s,
            )),
        }
    }
}

/// Units received at one unit cost.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CostLayer {
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// Value `on_hand` units by consuming `layers` in the given order.
///
/// The last layer touched may be taken partially. Units beyond the layers'
/// total stay unvalued.
pub fn consume_layers<I>(layers: I, on_hand: i64) -> Decimal
where
    I: IntoIterator<Item = CostLayer>,
{
    let mut remaining = on_hand;
    let mut value = Decimal::ZERO;
    for layer in layers {
        if remaining <= 0 {
            break;
        }
        if layer.quantity <= 0 {
            continue;
        }
        let take = layer.quantity.min(remaining);
        value += Decimal::from(take) * layer.unit_cost;
        remaining -= take;
    }
    value
}

/// Value of one item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemValuation {
    pub item_id: ItemId,
    pub quantity: i64,
    pub value: Decimal,
}

#[derive(Clone)]
pub struct ValuationEngine {
    catalog: Arc<dyn CatalogStore>,
    stocks: Arc<dyn StockStore>,
    journal: TransactionJournal,
    scan_limit: usize,
}

impl ValuationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stocks: Arc<dyn StockStore>,
        journal: TransactionJournal,
        scan_limit: usize,
    ) -> Self {
        Self {
            catalog,
            stocks,
            journal,
            scan_limit: scan_limit.max(1),
        }
    }

    /// Value of the on-hand quantity of `item` at `location`.
    ///
    /// Zero for non-positive quantities. FIFO/LIFO read costed receipts into
    /// the location from the journal; AVERAGE uses the item-wide weighted
    /// average receipt cost; STANDARD uses the catalog unit cost.
    pub fn calculate_value(
        &self,
        item: &ItemId,
        location: &LocationId,
        method: ValuationMethod,
    ) -> DomainResult<Decimal> {
        let record = self
            .stocks
            .get_stock(item, location)
            .map_err(|e| DomainError::store("get_stock", e))?;
        self.value_record(&record, method)
    }

    fn value_record(&self, record: &StockRecord, method: ValuationMethod) -> DomainResult<Decimal> {
        let on_hand = record.quantity();
        if on_hand <= 0 {
            return Ok(Decimal::ZERO);
        }
        let item = record.item_id();

        match method {
            ValuationMethod::Fifo => {
                let layers = self.cost_layers(item, record.location_id())?;
                Ok(consume_layers(layers, on_hand))
            }
            ValuationMethod::Lifo => {
                let layers = self.cost_layers(item, record.location_id())?;
                Ok(consume_layers(layers.into_iter().rev(), on_hand))
            }
            ValuationMethod::WeightedAverage => {
                Ok(Decimal::from(on_hand) * self.average_cost(item)?)
            }
            ValuationMethod::Standard => {
                let catalog_item = self
                    .catalog
                    .get_item(item)
                    .map_err(|e| DomainError::store("get_item", e))?;
                match catalog_item.unit_cost {
                    Some(cost) if cost > Decimal::ZERO => Ok(Decimal::from(on_hand) * cost),
                    _ => Err(DomainError::business_rule(
                        "standard_cost",
                        "item has no positive standard cost",
                        item.to_string(),
                    )),
                }
            }
        }
    }

    /// Weighted average unit cost over every costed inbound receipt of the
    /// item, at any location.
    pub fn average_cost(&self, item: &ItemId) -> DomainResult<Decimal> {
        let entries = self.journal.scan_item(item, self.scan_limit)?;
        let (quantity, cost) = entries
            .iter()
            .filter(|e| e.movement == MovementType::Inbound)
            .filter_map(|e| match e.unit_cost {
                Some(c) if c > Decimal::ZERO && e.quantity > 0 => Some((e.quantity, c)),
                _ => None,
            })
            .fold((0i64, Decimal::ZERO), |(q, v), (eq, c)| {
                (q + eq, v + Decimal::from(eq) * c)
            });

        if quantity == 0 {
            return Err(DomainError::insufficient_data(format!(
                "no costed receipts for item {item}"
            )));
        }
        Ok(cost / Decimal::from(quantity))
    }

    /// Sum of item values at a location. Items that cannot be valued are
    /// logged and skipped.
    pub fn total_value(
        &self,
        location: &LocationId,
        method: ValuationMethod,
    ) -> DomainResult<Decimal> {
        Ok(self
            .item_values(location, method)?
            .iter()
            .map(|v| v.value)
            .sum())
    }

    /// Per-item values at a location, ordered by item id. Items that cannot
    /// be valued are logged and left out.
    pub fn item_values(
        &self,
        location: &LocationId,
        method: ValuationMethod,
    ) -> DomainResult<Vec<ItemValuation>> {
        let records = self
            .stocks
            .stock_by_location(location)
            .map_err(|e| DomainError::storage("stock_by_location", e))?;

        let mut values = Vec::with_capacity(records.len());
        for record in records {
            match self.value_record(&record, method) {
                Ok(value) => values.push(ItemValuation {
                    item_id: record.item_id().clone(),
                    quantity: record.quantity(),
                    value,
                }),
                Err(error) => tracing::warn!(
                    %error,
                    item_id = %record.item_id(),
                    location_id = %location,
                    %method,
                    "skipping item in valuation"
                ),
            }
        }
        Ok(values)
    }

    /// Costed receipts into `location`, oldest first.
    fn cost_layers(&self, item: &ItemId, location: &LocationId) -> DomainResult<Vec<CostLayer>> {
        let mut entries: Vec<JournalEntry> = self
            .journal
            .scan_item(item, self.scan_limit)?
            .into_iter()
            .filter(|e| e.is_costed_receipt_at(location))
            .collect();
        oldest_first(&mut entries);
        Ok(entries
            .into_iter()
            .filter_map(|e| {
                e.unit_cost.map(|unit_cost| CostLayer {
                    quantity: e.quantity,
                    unit_cost,
                })
            })
            .collect())
    }
}
