//! Item and location catalog.
//!
//! The catalog is reference data: stock operations only require that the item
//! and location they name exist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, ItemId, LocationId};

use crate::storage::CatalogStore;
use crate::validation;

/// A stock-keeping item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Standard unit cost; used by STANDARD valuation and ABC estimates.
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            sku: None,
            description: None,
            category: None,
            unit_cost: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validation::name("name", &self.name)?;
        if let Some(sku) = &self.sku {
            validation::sku(sku)?;
        }
        if let Some(description) = &self.description {
            validation::description(description)?;
        }
        if let Some(category) = &self.category {
            validation::category(category)?;
        }
        if let Some(cost) = self.unit_cost {
            validation::unit_cost(cost)?;
        }
        Ok(())
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A place stock is held (warehouse, shop floor, truck...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// One of [`validation::LOCATION_KINDS`].
    pub kind: String,
    pub address: Option<String>,
    pub capacity: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn new(id: LocationId, name: impl Into<String>, kind: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            kind: kind.into(),
            address: None,
            capacity: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validation::name("name", &self.name)?;
        validation::location_kind(&self.kind)?;
        validation::capacity(self.capacity)?;
        if let Some(address) = &self.address {
            validation::description(address)?;
        }
        Ok(())
    }
}

impl Entity for Location {
    type Id = LocationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// CRUD over items and locations with validation.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    page_size: usize,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn create_item(&self, item: Item) -> DomainResult<Item> {
        item.validate()?;
        self.store
            .create_item(&item)
            .map_err(|e| DomainError::store("create_item", e))?;
        tracing::info!(item_id = %item.id, "item created");
        Ok(item)
    }

    pub fn get_item(&self, id: &ItemId) -> DomainResult<Item> {
        self.store
            .get_item(id)
            .map_err(|e| DomainError::store("get_item", e))
    }

    /// Replace an existing item's descriptive fields; `created_at` is preserved.
    pub fn update_item(&self, mut item: Item) -> DomainResult<Item> {
        item.validate()?;
        let existing = self.get_item(&item.id)?;
        item.created_at = existing.created_at;
        item.updated_at = Utc::now();
        self.store
            .update_item(&item)
            .map_err(|e| DomainError::store("update_item", e))?;
        Ok(item)
    }

    pub fn delete_item(&self, id: &ItemId) -> DomainResult<()> {
        self.store
            .delete_item(id)
            .map_err(|e| DomainError::store("delete_item", e))?;
        tracing::info!(item_id = %id, "item deleted");
        Ok(())
    }

    /// One page of items ordered by id; `limit == 0` uses the default page size.
    pub fn list_items(&self, offset: usize, limit: usize) -> DomainResult<Vec<Item>> {
        let limit = if limit == 0 { self.page_size } else { limit };
        self.store
            .list_items(offset, limit)
            .map_err(|e| DomainError::store("list_items", e))
    }

    /// Case-insensitive substring match on id, name, SKU and category.
    pub fn search_items(&self, query: &str) -> DomainResult<Vec<Item>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(DomainError::validation("query", "must not be blank", query));
        }
        let items = self
            .store
            .list_items(0, usize::MAX)
            .map_err(|e| DomainError::store("list_items", e))?;

        Ok(items
            .into_iter()
            .filter(|item| {
                let hit = |s: &str| s.to_lowercase().contains(&needle);
                hit(item.id.as_str())
                    || hit(&item.name)
                    || item.sku.as_deref().is_some_and(hit)
                    || item.category.as_deref().is_some_and(hit)
            })
            .collect())
    }

    pub fn create_location(&self, location: Location) -> DomainResult<Location> {
        location.validate()?;
        self.store
            .create_location(&location)
            .map_err(|e| DomainError::store("create_location", e))?;
        tracing::info!(location_id = %location.id, kind = %location.kind, "location created");
        Ok(location)
    }

    pub fn get_location(&self, id: &LocationId) -> DomainResult<Location> {
        self.store
            .get_location(id)
            .map_err(|e| DomainError::store("get_location", e))
    }

    pub fn update_location(&self, mut location: Location) -> DomainResult<Location> {
        location.validate()?;
        let existing = self.get_location(&location.id)?;
        location.created_at = existing.created_at;
        location.updated_at = Utc::now();
        self.store
            .update_location(&location)
            .map_err(|e| DomainError::store("update_location", e))?;
        Ok(location)
    }

    pub fn delete_location(&self, id: &LocationId) -> DomainResult<()> {
        self.store
            .delete_location(id)
            .map_err(|e| DomainError::store("delete_location", e))?;
        tracing::info!(location_id = %id, "location deleted");
        Ok(())
    }

    pub fn list_locations(&self) -> DomainResult<Vec<Location>> {
        self.store
            .list_locations()
            .map_err(|e| DomainError::store("list_locations", e))
    }
}
