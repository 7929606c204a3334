//! Configuration Module
//!
//! Handles loading and managing store configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Store configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the persisted profile and membership files
    pub data_dir: PathBuf,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum number of communities primed concurrently by the warm-up pass
    pub warmup_concurrency: usize,
    /// Whether startup primes every joined community's publications
    pub eager_warmup: bool,
    /// Capacity of each per-instance event bus
    pub event_capacity: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `THICKET_DATA_DIR` - Persistence directory (default: ./thicket-data)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `WARMUP_CONCURRENCY` - Warm-up fan-out bound, at least 1 (default: 2)
    /// - `EAGER_WARMUP` - Prime publications at startup (default: true)
    /// - `EVENT_CAPACITY` - Event bus capacity (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: env::var("THICKET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            warmup_concurrency: env::var("WARMUP_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.max(1))
                .unwrap_or(defaults.warmup_concurrency),
            eager_warmup: env::var("EAGER_WARMUP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.eager_warmup),
            event_capacity: env::var("EVENT_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.max(1))
                .unwrap_or(defaults.event_capacity),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./thicket-data"),
            server_port: 3000,
            warmup_concurrency: 2,
            eager_warmup: true,
            event_capacity: 64,
        }
    }
}
