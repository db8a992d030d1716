//! Input validation shared by the inventory services.
//!
//! Every check returns [`DomainError::Validation`] naming the offending field;
//! callers run them before touching storage.

use rust_decimal::Decimal;
use stockledger_core::{DomainError, DomainResult};

pub const MAX_QUANTITY: i64 = 999_999_999;
pub const MAX_NAME_LEN: usize = 500;
pub const MAX_SKU_LEN: usize = 255;
pub const MAX_CATEGORY_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_REFERENCE_LEN: usize = 500;
pub const MAX_LOT_NUMBER_LEN: usize = 100;
pub const MAX_CAPACITY: i64 = 999_999_999_999;

/// Largest accepted unit cost: 999 999.9999.
pub fn max_unit_cost() -> Decimal {
    Decimal::new(9_999_999_999, 4)
}

/// Location kinds accepted by the catalog.
pub const LOCATION_KINDS: &[&str] = &["warehouse", "store", "transit", "virtual"];

/// A movement quantity: strictly positive and within range.
pub fn positive_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(
            "quantity",
            "must be positive",
            quantity,
        ));
    }
    quantity_in_range(quantity)
}

/// A target quantity (adjustments): may be zero or negative, but bounded.
pub fn quantity_in_range(quantity: i64) -> DomainResult<()> {
    if !(-MAX_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return Err(DomainError::validation(
            "quantity",
            format!("must be within ±{MAX_QUANTITY}"),
            quantity,
        ));
    }
    Ok(())
}

pub fn reference(value: &str) -> DomainResult<()> {
    if value.len() > MAX_REFERENCE_LEN {
        return Err(DomainError::validation(
            "reference",
            format!("must be at most {MAX_REFERENCE_LEN} bytes"),
            value.len(),
        ));
    }
    Ok(())
}

fn bounded(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be blank", value));
    }
    if value.len() > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} bytes"),
            value.len(),
        ));
    }
    Ok(())
}

pub fn name(field: &str, value: &str) -> DomainResult<()> {
    bounded(field, value, MAX_NAME_LEN)
}

pub fn sku(value: &str) -> DomainResult<()> {
    bounded("sku", value, MAX_SKU_LEN)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "sku",
            "may only contain ASCII letters, digits, '.', '-' and '_'",
            value,
        ));
    }
    Ok(())
}

pub fn category(value: &str) -> DomainResult<()> {
    bounded("category", value, MAX_CATEGORY_LEN)
}

pub fn description(value: &str) -> DomainResult<()> {
    if value.len() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} bytes"),
            value.len(),
        ));
    }
    Ok(())
}

pub fn unit_cost(value: Decimal) -> DomainResult<()> {
    let max = max_unit_cost();
    if value < Decimal::ZERO || value > max {
        return Err(DomainError::validation(
            "unit_cost",
            format!("must be within 0..={max}"),
            value,
        ));
    }
    Ok(())
}

pub fn lot_number(value: &str) -> DomainResult<()> {
    bounded("lot_number", value, MAX_LOT_NUMBER_LEN)
}

pub fn capacity(value: i64) -> DomainResult<()> {
    if !(0..=MAX_CAPACITY).contains(&value) {
        return Err(DomainError::validation(
            "capacity",
            format!("must be within 0..={MAX_CAPACITY}"),
            value,
        ));
    }
    Ok(())
}

pub fn location_kind(value: &str) -> DomainResult<()> {
    if !LOCATION_KINDS.contains(&value) {
        return Err(DomainError::validation(
            "kind",
            format!("must be one of {}", LOCATION_KINDS.join(", ")),
            value,
        ));
    }
    Ok(())
}
