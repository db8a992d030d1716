//! Inventory policy configuration.
//!
//! Defaults match a conservative single-warehouse deployment. Deployments
//! override them through `STOCKLEDGER_*` environment variables (see
//! [`InventoryConfig::from_env`]) or by deserializing the struct from whatever
//! format their adapter layer loads.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Policy knobs for the ledger, alerting, valuation and classification services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Allow removals/adjustments to drive quantity below zero.
    pub allow_negative_stock: bool,
    /// A removal leaving `quantity <= low_stock_threshold` raises a low-stock alert.
    pub low_stock_threshold: i64,
    /// History page size when callers pass a non-positive limit.
    pub history_default_limit: usize,
    /// Upper bound on journal entries scanned for valuation/analytics.
    pub history_scan_limit: usize,
    /// Assumed yearly turnover used by the ABC estimate (on_hand × multiplier × cost).
    pub abc_turnover_multiplier: i64,
    /// Cumulative value share up to which items are class A.
    pub abc_a_cutoff: Decimal,
    /// Cumulative value share up to which items are class B.
    pub abc_b_cutoff: Decimal,
    /// How many finished batches a batch store keeps for status lookups.
    pub batch_history_capacity: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            allow_negative_stock: false,
            low_stock_threshold: 10,
            history_default_limit: 100,
            history_scan_limit: 10_000,
            abc_turnover_multiplier: 10,
            abc_a_cutoff: Decimal::new(80, 2),
            abc_b_cutoff: Decimal::new(95, 2),
            batch_history_capacity: 1_000,
        }
    }
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: core::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl InventoryConfig {
    /// Defaults overridden by `STOCKLEDGER_*` environment variables, then validated.
    ///
    /// Recognized keys: `ALLOW_NEGATIVE_STOCK`, `LOW_STOCK_THRESHOLD`,
    /// `HISTORY_DEFAULT_LIMIT`, `HISTORY_SCAN_LIMIT`, `ABC_TURNOVER_MULTIPLIER`,
    /// `ABC_A_CUTOFF`, `ABC_B_CUTOFF`, `BATCH_HISTORY_CAPACITY` (all prefixed
    /// with `STOCKLEDGER_`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = env_value("STOCKLEDGER_ALLOW_NEGATIVE_STOCK")? {
            cfg.allow_negative_stock = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_LOW_STOCK_THRESHOLD")? {
            cfg.low_stock_threshold = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_HISTORY_DEFAULT_LIMIT")? {
            cfg.history_default_limit = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_HISTORY_SCAN_LIMIT")? {
            cfg.history_scan_limit = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_ABC_TURNOVER_MULTIPLIER")? {
            cfg.abc_turnover_multiplier = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_ABC_A_CUTOFF")? {
            cfg.abc_a_cutoff = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_ABC_B_CUTOFF")? {
            cfg.abc_b_cutoff = v;
        }
        if let Some(v) = env_value("STOCKLEDGER_BATCH_HISTORY_CAPACITY")? {
            cfg.batch_history_capacity = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "low_stock_threshold must be >= 0".to_string(),
            ));
        }
        if self.history_default_limit == 0
            || self.history_scan_limit == 0
            || self.batch_history_capacity == 0
        {
            return Err(ConfigError::Invalid(
                "history limits must be positive".to_string(),
            ));
        }
        if self.abc_turnover_multiplier <= 0 {
            return Err(ConfigError::Invalid(
                "abc_turnover_multiplier must be positive".to_string(),
            ));
        }
        let unit = Decimal::ONE;
        if self.abc_a_cutoff <= Decimal::ZERO
            || self.abc_b_cutoff > unit
            || self.abc_a_cutoff > self.abc_b_cutoff
        {
            return Err(ConfigError::Invalid(
                "abc cut points must satisfy 0 < a <= b <= 1".to_string(),
            ));
        }
        Ok(())
    }
}
