//! Cache-aside quote resolution.
//!
//! `QuoteResolver` is the only surface callers use. A lookup goes
//! store → (miss) provider → store upsert → caller. Misses for the same
//! symbol are coalesced through `SingleFlight`, so concurrent callers share
//! one provider request. The store lock is never held while the provider is
//! being called.

use std::sync::Arc;

use log::{debug, info, warn};
use quote_common::{QuoteRecord, Symbol};

use crate::error::ResolverError;
use crate::inflight::SingleFlight;
use crate::provider::QuoteProvider;
use crate::store::QuoteStore;

type Outcome = Result<QuoteRecord, ResolverError>;

/// Serves quotes from the store, falling back to the provider.
pub struct QuoteResolver {
    store: Arc<dyn QuoteStore>,
    provider: Arc<dyn QuoteProvider>,
    misses: SingleFlight<Symbol, Outcome>,
    refreshes: SingleFlight<Symbol, Outcome>,
}

impl QuoteResolver {
    /// Wire a resolver over a store and a provider.
    pub fn new(store: Arc<dyn QuoteStore>, provider: Arc<dyn QuoteProvider>) -> Self {
        Self {
            store,
            provider,
            misses: SingleFlight::new(),
            refreshes: SingleFlight::new(),
        }
    }

    /// Return the quote for `raw_symbol`, preferring the store.
    ///
    /// A cache hit never touches the network. On a miss the provider is asked
    /// once; a fetched quote is cached before it is returned. When caching
    /// fails the quote is still delivered inside
    /// [`ResolverError::PersistenceFailed`].
    pub fn get_quote(&self, raw_symbol: &str) -> Outcome {
        let symbol = Symbol::parse(raw_symbol)?;

        if let Some(record) = self.store.lookup(&symbol)? {
            return Ok(record);
        }

        self.misses
            .run(&symbol, || {
                // A leader that finished just before we joined has already
                // filled the store.
                if let Some(record) = self.store.lookup(&symbol)? {
                    return Ok(record);
                }
                self.fetch_and_store(&symbol)
            })
            .unwrap_or_else(|| abandoned(&symbol))
    }

    /// Fetch `raw_symbol` from the provider regardless of what is cached and
    /// overwrite the cached row.
    pub fn refresh_quote(&self, raw_symbol: &str) -> Outcome {
        let symbol = Symbol::parse(raw_symbol)?;
        info!("Refreshing {} from {}", symbol, self.provider.name());
        self.refreshes
            .run(&symbol, || self.fetch_and_store(&symbol))
            .unwrap_or_else(|| abandoned(&symbol))
    }

    /// Drop every cached quote.
    pub fn reset(&self) -> Result<(), ResolverError> {
        warn!("Resetting quote cache");
        Ok(self.store.reset()?)
    }

    /// Symbols currently cached.
    pub fn cached_symbols(&self) -> Result<Vec<Symbol>, ResolverError> {
        Ok(self.store.symbols()?)
    }

    fn fetch_and_store(&self, symbol: &Symbol) -> Outcome {
        debug!("Fetching data for {}...", symbol);
        let record = match self.provider.fetch(symbol) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(ResolverError::NotFound(symbol.to_string())),
            Err(e) => {
                warn!("Provider {} failed for {}: {}", self.provider.name(), symbol, e);
                return Err(e.into());
            }
        };

        match self.store.upsert(&record) {
            Ok(()) => Ok(record),
            Err(e) => {
                warn!("Serving {} uncached: {}", record.symbol, e);
                Err(ResolverError::PersistenceFailed {
                    record,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn abandoned(symbol: &Symbol) -> Outcome {
    Err(ResolverError::ProviderUnavailable(format!(
        "in-flight fetch for {symbol} was abandoned"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StoreError};
    use crate::store::SqliteQuoteStore;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider answering from a fixed script and counting calls.
    struct ScriptedProvider {
        answer: Mutex<Option<Result<Option<QuoteRecord>, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(answer: Result<Option<QuoteRecord>, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(Some(answer)),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuoteProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch(&self, _symbol: &Symbol) -> Result<Option<QuoteRecord>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ProviderError::Transport("script exhausted".into())))
        }
    }

    fn apple() -> QuoteRecord {
        QuoteRecord {
            name: Some("Apple Inc.".into()),
            price: Some(172.35),
            exchange: Some("NASDAQ".into()),
            exchange_short: Some("NASDAQ".into()),
            instrument_type: Some("stock".into()),
            ..QuoteRecord::new(Symbol::parse("AAPL").unwrap())
        }
    }

    fn store() -> Arc<SqliteQuoteStore> {
        Arc::new(SqliteQuoteStore::open_in_memory().unwrap())
    }

    #[test]
    fn lowercase_input_is_normalized_before_lookup() {
        let store = store();
        store.upsert(&apple()).unwrap();
        let provider = ScriptedProvider::new(Ok(None));
        let resolver = QuoteResolver::new(store, provider.clone());

        assert_eq!(resolver.get_quote("  aapl ").unwrap(), apple());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn refresh_bypasses_cache_and_overwrites() {
        let store = store();
        store.upsert(&apple()).unwrap();
        let newer = QuoteRecord {
            price: Some(180.0),
            ..apple()
        };
        let provider = ScriptedProvider::new(Ok(Some(newer.clone())));
        let resolver = QuoteResolver::new(store.clone(), provider.clone());

        assert_eq!(resolver.refresh_quote("AAPL").unwrap(), newer);
        assert_eq!(provider.calls(), 1);
        assert_eq!(store.lookup(&newer.symbol).unwrap(), Some(newer));
    }

    #[test]
    fn provider_outage_is_retryable_and_writes_nothing() {
        let store = store();
        let provider = ScriptedProvider::new(Err(ProviderError::Timeout));
        let resolver = QuoteResolver::new(store.clone(), provider);

        let err = resolver.get_quote("AAPL").unwrap_err();
        assert!(matches!(err, ResolverError::ProviderUnavailable(_)));
        assert!(err.is_retryable());
        assert!(store.symbols().unwrap().is_empty());
    }

    #[test]
    fn reset_and_listing_pass_through() {
        let store = store();
        store.upsert(&apple()).unwrap();
        let resolver = QuoteResolver::new(store, ScriptedProvider::new(Ok(None)));

        assert_eq!(resolver.cached_symbols().unwrap(), vec![apple().symbol]);
        resolver.reset().unwrap();
        assert!(resolver.cached_symbols().unwrap().is_empty());
    }

    #[test]
    fn lookup_failure_surfaces_as_store_error() {
        struct BrokenStore;
        impl QuoteStore for BrokenStore {
            fn lookup(&self, _: &Symbol) -> Result<Option<QuoteRecord>, StoreError> {
                Err(StoreError::IoFailure("disk gone".into()))
            }
            fn upsert(&self, _: &QuoteRecord) -> Result<(), StoreError> {
                Err(StoreError::IoFailure("disk gone".into()))
            }
            fn contains(&self, _: &Symbol) -> Result<bool, StoreError> {
                Err(StoreError::IoFailure("disk gone".into()))
            }
            fn reset(&self) -> Result<(), StoreError> {
                Err(StoreError::IoFailure("disk gone".into()))
            }
            fn symbols(&self) -> Result<Vec<Symbol>, StoreError> {
                Err(StoreError::IoFailure("disk gone".into()))
            }
        }

        let provider = ScriptedProvider::new(Ok(Some(apple())));
        let resolver = QuoteResolver::new(Arc::new(BrokenStore), provider.clone());
        let err = resolver.get_quote("AAPL").unwrap_err();
        assert!(matches!(err, ResolverError::Store(StoreError::IoFailure(_))));
        assert_eq!(provider.calls(), 0);
    }
}
