//! Quote cache TCP server.
//!
//! Listens for newline-delimited JSON commands and answers them from a local
//! SQLite cache, falling back to the remote quote API on a miss. It wires
//! together three building blocks:
//!
//! - `SqliteQuoteStore` — durable symbol → quote table. Opening it never
//!   drops existing rows; pass `--reset-on-start` to start from an empty
//!   cache.
//! - `FmpProvider` — blocking HTTP client for the quote API with a bounded
//!   request timeout. The API key comes from `--api-key` or `QUOTE_API_KEY`.
//! - `QuoteResolver` — cache-aside lookup shared by every client thread, with
//!   concurrent misses for one symbol coalesced into a single fetch.
//!
//! `QuoteReceiver` accepts connections and runs one thread per client; an
//! error in one client's session is logged and does not affect the others.
use clap::Parser;
use log::{error, info};
use quote_server::config::ServerConfig;
use quote_server::receiver::QuoteReceiver;
use quote_server::{FmpProvider, QuoteResolver, QuoteStore, ServerError, SqliteQuoteStore};
use std::sync::Arc;

fn main() -> Result<(), ServerError> {
    init_logger();
    let config = ServerConfig::parse();
    if let Err(e) = run(config) {
        error!("Quote server stopped: {}", e);
        return Err(e);
    }
    Ok(())
}

fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    let store = Arc::new(SqliteQuoteStore::open(&config.db_path)?);
    if config.reset_on_start {
        store.reset()?;
    }

    let provider = Arc::new(FmpProvider::new(
        config.api_base_url.clone(),
        config.api_key.clone(),
        config.timeout(),
    )?);
    info!(
        "Quote provider at {} (timeout {}s)",
        config.api_base_url, config.timeout_secs
    );

    let resolver = Arc::new(QuoteResolver::new(store, provider));
    let receiver = QuoteReceiver::new(&config.bind)?;
    receiver.serve(resolver)?;
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
