//!
//! Common types and utilities shared by the quote server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `ParserError` used across the workspace.
//! - `result` — handy `Result<T, ParserError>` alias.
//! - `tickers` — validated ticker `Symbol` and symbol-file parsing.
//! - `quote` — the cached `QuoteRecord`.
//! - `command` — newline-delimited JSON commands and responses exchanged over TCP.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod command;
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod tickers;

pub use command::{Command, ErrorKind, Response};
pub use error::{ParserError, SymbolError};
pub use quote::QuoteRecord;
pub use result::Result;
pub use tickers::Symbol;
