//! Error types of the quote server.
//!
//! Each layer has its own enum: `StoreError` for the SQLite cache,
//! `ProviderError` for the remote API and `ResolverError` for the
//! caller-facing operations. `ResolverError` is `Clone` so that a single
//! in-flight fetch can hand the same outcome to every waiting caller.
use std::sync::PoisonError;

use quote_common::{ErrorKind, QuoteRecord, SymbolError};
use thiserror::Error;

/// Failure of the local quote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The database is unreachable or a statement could not be committed.
    #[error("store I/O failure: {0}")]
    IoFailure(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::IoFailure(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(err: PoisonError<T>) -> Self {
        StoreError::IoFailure(format!("connection lock poisoned: {err}"))
    }
}

/// Failure talking to the remote quote API.
///
/// "Symbol unknown" is not an error: providers return `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout.
    #[error("provider timed out")]
    Timeout,

    /// Connection, TLS or other transport failure.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The API key was rejected (401/403).
    #[error("provider rejected the API key (HTTP {0})")]
    Unauthorized(u16),

    /// Any other non-success status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// The body could not be mapped to a valid quote.
    #[error("malformed provider payload: {0}")]
    Malformed(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Failure of `get_quote` / `refresh_quote`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// Empty or malformed input; never reaches the store or the provider.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolError),

    /// The provider has no data for this symbol.
    #[error("No data found for {0}.")]
    NotFound(String),

    /// The provider could not be reached or answered with an error.
    #[error("quote provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider rejected the configured API key.
    #[error("quote provider rejected the API key: {0}")]
    ProviderRejected(String),

    /// The quote was fetched but not cached. The record is still delivered.
    #[error("quote for {} fetched but not cached: {reason}", .record.symbol)]
    PersistenceFailed {
        /// The freshly fetched quote.
        record: QuoteRecord,
        /// Store failure detail.
        reason: String,
    },

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolverError {
    /// Wire category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolverError::InvalidSymbol(_) => ErrorKind::InvalidSymbol,
            ResolverError::NotFound(_) => ErrorKind::NotFound,
            ResolverError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            ResolverError::ProviderRejected(_) => ErrorKind::ProviderRejected,
            ResolverError::PersistenceFailed { .. } => ErrorKind::PersistenceFailed,
            ResolverError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    /// Only provider outages are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// The fetched record carried by `PersistenceFailed`, if any.
    pub fn record(&self) -> Option<&QuoteRecord> {
        match self {
            ResolverError::PersistenceFailed { record, .. } => Some(record),
            _ => None,
        }
    }
}

impl From<ProviderError> for ResolverError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unauthorized(_) => ResolverError::ProviderRejected(err.to_string()),
            _ => ResolverError::ProviderUnavailable(err.to_string()),
        }
    }
}

/// Startup failure of the server binary.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Could not open the quote store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Could not build the provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Socket or wire failure.
    #[error(transparent)]
    Wire(#[from] quote_common::ParserError),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}
