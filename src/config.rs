//! Server configuration, parsed from the command line.

use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "redlite", version, about = "An in-memory key-value server speaking RESP")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between two active expiry sweeps
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_ms: u64,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}
