//! Error types shared between client and server.
//!
//! `ParserError` unifies the failure cases of the wire layer (I/O, JSON,
//! symbol files) so both binaries can propagate a single error type.
//! `SymbolError` describes why a raw ticker string was rejected.
use std::io;

use thiserror::Error;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum ParserError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing a symbols file into `Symbol` values.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// A ticker symbol failed validation.
    #[error("Invalid symbol: {0}")]
    Symbol(#[from] SymbolError),

    /// The peer closed the connection before a full line was exchanged.
    #[error("Connection closed by peer")]
    ConnectionClosed,
}

/// Reasons a raw string cannot become a `Symbol`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// Nothing left after trimming.
    #[error("symbol is empty")]
    Empty,

    /// Longer than `tickers::MAX_SYMBOL_LEN`.
    #[error("symbol '{0}' is too long")]
    TooLong(String),

    /// Contains a character outside `A-Z 0-9 . - ^ =`.
    #[error("symbol '{symbol}' contains invalid character '{ch}'")]
    InvalidChar {
        /// The normalized symbol.
        symbol: String,
        /// First offending character.
        ch: char,
    },

    /// Punctuation only, or starts with something other than a letter,
    /// digit or `^`.
    #[error("symbol '{0}' is not a ticker")]
    Malformed(String),
}
