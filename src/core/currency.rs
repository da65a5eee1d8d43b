//! Exchange rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use super::conversion::ConversionError;

/// Rates keyed by currency code, relative to a single base currency.
pub type RateTable = HashMap<String, f64>;

#[async_trait]
pub trait RateTableProvider: Send + Sync {
    /// Fetches the full rate table for `base`. Implementations must not cache.
    async fn fetch_rates(&self, base: &str) -> Result<RateTable>;
}

/// Picks the rate for `target`. A zero rate counts as missing.
pub fn lookup_rate(table: &RateTable, target: &str) -> Result<f64, ConversionError> {
    match table.get(target) {
        Some(rate) if *rate != 0.0 => Ok(*rate),
        _ => Err(ConversionError::InvalidCurrency),
    }
}
