//! Remote quote provider.
//!
//! `QuoteProvider` abstracts the source of truth so the resolver can be tested
//! with a stub. `FmpProvider` talks to a Financial Modeling Prep style API:
//! `GET {base}/v3/quote/{symbol}?apikey={key}` answering a JSON array whose
//! first element is the quote.

use std::time::Duration;

use log::{debug, warn};
use quote_common::quote::is_valid_price;
use quote_common::{QuoteRecord, Symbol};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::ProviderError;

/// Source of truth for quotes.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch a single quote. `Ok(None)` means the provider has no data for
    /// the symbol; `Err` means it could not be asked.
    fn fetch(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, ProviderError>;
}

/// One element of the `/v3/quote` response array.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: Option<String>,
    name: Option<String>,
    price: Option<f64>,
    exchange: Option<String>,
    exchange_short_name: Option<String>,
    #[serde(rename = "type")]
    instrument_type: Option<String>,
}

impl FmpQuote {
    fn into_record(self, requested: &Symbol) -> Result<QuoteRecord, ProviderError> {
        let raw_symbol = self
            .symbol
            .ok_or_else(|| ProviderError::Malformed("quote without symbol".into()))?;
        let symbol = Symbol::parse(&raw_symbol)
            .map_err(|e| ProviderError::Malformed(format!("bad symbol in payload: {e}")))?;
        if &symbol != requested {
            warn!("Provider answered {} for requested {}", symbol, requested);
        }
        if let Some(price) = self.price {
            if !is_valid_price(price) {
                return Err(ProviderError::Malformed(format!(
                    "invalid price {price} for {symbol}"
                )));
            }
        }
        Ok(QuoteRecord {
            symbol,
            name: self.name,
            price: self.price,
            exchange: self.exchange,
            exchange_short: self.exchange_short_name,
            instrument_type: self.instrument_type,
        })
    }
}

/// HTTP provider for the Financial Modeling Prep quote endpoint.
pub struct FmpProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl FmpProvider {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://financialmodelingprep.com/api";

    /// Build a provider with a bounded request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quote_server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Endpoint URL for a symbol, without the API key.
    fn quote_url(&self, symbol: &Symbol) -> String {
        format!("{}/v3/quote/{}", self.base_url, symbol)
    }
}

impl QuoteProvider for FmpProvider {
    fn name(&self) -> &str {
        "financial_modeling_prep"
    }

    fn fetch(&self, symbol: &Symbol) -> Result<Option<QuoteRecord>, ProviderError> {
        let url = self.quote_url(symbol);
        debug!("Fetching {} from {}", symbol, url);

        let resp = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized(status.as_u16()));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let quotes: Vec<FmpQuote> = resp
            .json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        match quotes.into_iter().next() {
            Some(quote) => quote.into_record(symbol).map(Some),
            None => {
                debug!("Provider has no data for {}", symbol);
                Ok(None)
            }
        }
    }
}
