//! Command-line and environment configuration for the quote server.
//!
//! Every flag has an environment fallback so the API key never has to appear
//! on a command line or in source.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use quote_common::net::{COMMAND_PORT, addr};

use crate::error::ServerError;
use crate::provider::FmpProvider;

/// Parsed server configuration.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Cache-aside quote server", long_about = None)]
pub struct ServerConfig {
    /// Address the TCP command listener binds to.
    #[arg(long, env = "QUOTE_BIND", default_value_t = addr("0.0.0.0", COMMAND_PORT))]
    pub bind: String,

    /// SQLite database file used as the quote cache.
    #[arg(long, env = "QUOTE_DB_PATH", default_value = "quotes.db")]
    pub db_path: PathBuf,

    /// Root URL of the quote API.
    #[arg(long, env = "QUOTE_API_BASE_URL", default_value = FmpProvider::DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// API key for the quote provider.
    #[arg(long, env = "QUOTE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Upper bound for a single provider request, in seconds.
    #[arg(long, env = "QUOTE_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Drop and recreate the quote table before serving.
    #[arg(long, default_value_t = false)]
    pub reset_on_start: bool,
}

impl ServerConfig {
    /// Reject values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.api_key.trim().is_empty() {
            return Err(ServerError::Config("API key must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ServerError::Config("timeout must be at least 1 second".into()));
        }
        Ok(())
    }

    /// Provider request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
