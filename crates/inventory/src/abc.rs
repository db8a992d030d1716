//! ABC classification by estimated annual value.
//!
//! Each item's annual value is estimated as `on_hand × turnover multiplier ×
//! unit cost`. Items are ranked by that estimate and classed by where their
//! cumulative share of the total falls: up to the A cut point is A, up to the
//! B cut point is B, the rest C.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, ItemId, LocationId};

use crate::config::InventoryConfig;
use crate::storage::{CatalogStore, StockStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl core::fmt::Display for AbcClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            AbcClass::A => "A",
            AbcClass::B => "B",
            AbcClass::C => "C",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcEntry {
    pub item_id: ItemId,
    pub annual_value: Decimal,
    /// Share of the total value held by this item and every item ranked above it.
    pub cumulative_share: Decimal,
    pub class: AbcClass,
}

/// Rank `values` descending (ties keep input order) and class them.
///
/// When the total is not positive there is nothing to rank by and every item
/// is C.
pub fn classify(
    mut values: Vec<(ItemId, Decimal)>,
    a_cutoff: Decimal,
    b_cutoff: Decimal,
) -> Vec<AbcEntry> {
    let total: Decimal = values.iter().map(|(_, v)| *v).sum();
    if total <= Decimal::ZERO {
        return values
            .into_iter()
            .map(|(item_id, annual_value)| AbcEntry {
                item_id,
                annual_value,
                cumulative_share: Decimal::ZERO,
                class: AbcClass::C,
            })
            .collect();
    }

    values.sort_by(|a, b| b.1.cmp(&a.1));

    let mut running = Decimal::ZERO;
    values
        .into_iter()
        .map(|(item_id, annual_value)| {
            running += annual_value;
            let cumulative_share = running / total;
            let class = if cumulative_share <= a_cutoff {
                AbcClass::A
            } else if cumulative_share <= b_cutoff {
                AbcClass::B
            } else {
                AbcClass::C
            };
            AbcEntry {
                item_id,
                annual_value,
                cumulative_share,
                class,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct AbcClassifier {
    catalog: Arc<dyn CatalogStore>,
    stocks: Arc<dyn StockStore>,
    multiplier: i64,
    a_cutoff: Decimal,
    b_cutoff: Decimal,
}

impl AbcClassifier {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        stocks: Arc<dyn StockStore>,
        config: &InventoryConfig,
    ) -> Self {
        Self {
            catalog,
            stocks,
            multiplier: config.abc_turnover_multiplier,
            a_cutoff: config.abc_a_cutoff,
            b_cutoff: config.abc_b_cutoff,
        }
    }

    /// Ranked classification of every item stocked at `location`.
    ///
    /// Items missing from the catalog are logged and skipped; items without a
    /// unit cost count as zero value.
    pub fn classify_location(&self, location: &LocationId) -> DomainResult<Vec<AbcEntry>> {
        let records = self
            .stocks
            .stock_by_location(location)
            .map_err(|e| DomainError::storage("stock_by_location", e))?;

        let mut values = Vec::with_capacity(records.len());
        for record in records {
            let item = match self.catalog.get_item(record.item_id()) {
                Ok(item) => item,
                Err(error) => {
                    tracing::warn!(
                        %error,
                        item_id = %record.item_id(),
                        location_id = %location,
                        "skipping item in abc classification"
                    );
                    continue;
                }
            };
            let unit_cost = item.unit_cost.unwrap_or(Decimal::ZERO);
            let annual = Decimal::from(record.quantity()) * Decimal::from(self.multiplier) * unit_cost;
            values.push((item.id, annual));
        }

        Ok(classify(values, self.a_cutoff, self.b_cutoff))
    }

    /// Item → class lookup for a location.
    pub fn classification_map(&self, location: &LocationId) -> DomainResult<BTreeMap<ItemId, AbcClass>> {
        Ok(self
            .classify_location(location)?
            .into_iter()
            .map(|e| (e.item_id, e.class))
            .collect())
    }
}
