//! Cache-aside quote service.
//!
//! - `store` — SQLite-backed `QuoteStore`.
//! - `provider` — `QuoteProvider` trait and the HTTP `FmpProvider`.
//! - `resolver` — `QuoteResolver`, the caller-facing `get_quote`/`refresh_quote`.
//! - `inflight` — per-symbol request coalescing used by the resolver.
//! - `receiver` — TCP command server speaking the `quote_common` protocol.
//! - `config` — CLI/environment configuration.
//! - `error` — error enums for every layer.
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod inflight;
pub mod provider;
pub mod receiver;
pub mod resolver;
pub mod store;

pub use error::{ProviderError, ResolverError, ServerError, StoreError};
pub use provider::{FmpProvider, QuoteProvider};
pub use resolver::QuoteResolver;
pub use store::{QuoteStore, SqliteQuoteStore};
