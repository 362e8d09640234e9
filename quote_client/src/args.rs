//! Command-line arguments for the Quote Client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use quote_common::net::COMMAND_PORT;
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server IP address (IPv4 or IPv6) where the quote service is running.
    #[arg(long, env = "QUOTE_SERVER_IP", default_value = "127.0.0.1")]
    pub server_ip: String,

    /// TCP command port of the quote service.
    #[arg(long, env = "QUOTE_SERVER_PORT", default_value_t = COMMAND_PORT)]
    pub port: u16,

    /// What to ask the server.
    #[command(subcommand)]
    pub action: Action,
}

/// Client operations.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Look up quotes, served from the cache when possible.
    Get {
        /// Ticker symbols, e.g. `AAPL MSFT`.
        symbols: Vec<String>,

        /// Text file with tickers separated by commas, spaces, or new lines.
        #[arg(long)]
        path: Option<String>,
    },
    /// Fetch a fresh quote from the provider and overwrite the cached one.
    Refresh {
        /// Ticker symbol.
        symbol: String,
    },
    /// List cached symbols.
    List,
    /// Drop every cached quote.
    Reset,
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
pub fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
