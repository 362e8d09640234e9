//! Quote data model shared by the store, the provider adapter and the client.
//!
//! A `QuoteRecord` is the unit of cached data. Every field except the symbol
//! is optional because the upstream API omits fields for some instruments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tickers::Symbol;

/// Point-in-time price and descriptive metadata for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Uppercase ticker, unique key in the store.
    pub symbol: Symbol,
    /// Company or instrument display name.
    pub name: Option<String>,
    /// Last known trade price. Finite and non-negative when present.
    pub price: Option<f64>,
    /// Full exchange name, e.g. `NASDAQ Global Select`.
    pub exchange: Option<String>,
    /// Exchange code, e.g. `NASDAQ`.
    pub exchange_short: Option<String>,
    /// Instrument kind such as `stock` or `etf`.
    pub instrument_type: Option<String>,
}

impl QuoteRecord {
    /// Record with only the symbol populated.
    pub fn new(symbol: Symbol) -> Self {
        QuoteRecord {
            symbol,
            name: None,
            price: None,
            exchange: None,
            exchange_short: None,
            instrument_type: None,
        }
    }

    /// Returns `true` when the price is absent or a finite, non-negative number.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_none_or(is_valid_price)
    }
}

/// A price is storable when it is finite and not below zero.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dash = "-";
        writeln!(
            f,
            "Market Data for {} ({})",
            self.name.as_deref().unwrap_or(dash),
            self.symbol
        )?;
        match self.price {
            Some(price) => writeln!(f, "  Price: ${:.2}", price)?,
            None => writeln!(f, "  Price: {}", dash)?,
        }
        writeln!(
            f,
            "  Exchange: {} ({})",
            self.exchange.as_deref().unwrap_or(dash),
            self.exchange_short.as_deref().unwrap_or(dash)
        )?;
        write!(
            f,
            "  Type: {}",
            self.instrument_type.as_deref().unwrap_or(dash)
        )
    }
}
