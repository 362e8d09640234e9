//! Shared protocol types used by client and server.
//!
//! The protocol is newline-delimited JSON over TCP: the client writes one
//! `Command` per line and reads exactly one `Response` line back. A single
//! connection may carry any number of exchanges.
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::ParserError;
use crate::quote::QuoteRecord;
use crate::tickers::Symbol;

/// Request sent from a caller to the quote server.
///
/// Symbols travel as raw strings so that the server, not the client, decides
/// whether they are valid and reports `InvalidSymbol` uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Cache-aside lookup.
    Get {
        /// Raw ticker as typed by the user.
        symbol: String,
    },
    /// Bypass the cache, fetch from the provider and overwrite the cached row.
    Refresh {
        /// Raw ticker as typed by the user.
        symbol: String,
    },
    /// Drop and recreate the quote table.
    Reset,
    /// List every cached symbol.
    List,
}

/// Error categories reported over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ErrorKind {
    /// Empty or malformed symbol; caller error, do not retry.
    InvalidSymbol,
    /// The provider does not know the symbol.
    NotFound,
    /// Network failure, timeout or non-2xx from the provider; safe to retry.
    ProviderUnavailable,
    /// The provider refused our credentials; retrying will not help until
    /// the server's API key is fixed.
    ProviderRejected,
    /// Fetched successfully but the cache write failed.
    PersistenceFailed,
    /// The local store could not be read or reset.
    StoreFailure,
    /// The request line could not be decoded.
    BadRequest,
}

impl ErrorKind {
    /// Whether a caller may retry the same request with backoff.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::ProviderUnavailable)
    }
}

/// Reply to a single `Command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    /// A quote served from the cache or freshly fetched and cached.
    Quote {
        /// The quote.
        record: QuoteRecord,
    },
    /// A freshly fetched quote that could not be written to the cache.
    Partial {
        /// The fetched quote.
        record: QuoteRecord,
        /// Why the cache write failed.
        error: String,
    },
    /// Cached symbols in ascending order.
    Symbols {
        /// The symbols.
        symbols: Vec<Symbol>,
    },
    /// Administrative command completed.
    Done,
    /// The command failed.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },
}

impl Command {
    /// Encode as a single JSON line including the trailing `\n`.
    pub fn to_line(&self) -> Result<Vec<u8>, ParserError> {
        to_line(self)
    }

    /// Decode from one line of input.
    pub fn from_line(line: &str) -> Result<Self, ParserError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

impl Response {
    /// Encode as a single JSON line including the trailing `\n`.
    pub fn to_line(&self) -> Result<Vec<u8>, ParserError> {
        to_line(self)
    }

    /// Decode from one line of input.
    pub fn from_line(line: &str) -> Result<Self, ParserError> {
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Shorthand for an error response.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }
}

fn to_line<T: Serialize>(value: &T) -> Result<Vec<u8>, ParserError> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}
