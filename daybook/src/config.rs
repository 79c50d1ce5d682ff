//! Configuration management for the planner.
//!
//! Loads configuration from environment variables with sensible defaults.

use daybook_client::{ClientConfig, DEFAULT_BASE_URL};
use daybook_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Todo service connection
    pub api: ApiConfig,
    /// Store runtime behaviour
    pub store: StoreSettings,
    /// Logging
    pub log: LogConfig,
}

/// Todo service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the todo service
    pub base_url: String,
}

/// Store runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Seconds to wait for the outcome of a request
    pub outcome_timeout_secs: u64,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout_secs: u64,
    /// Outcome actions buffered for observers
    pub broadcast_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub filter: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Falls back to defaults for any variable that is unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                base_url: env::var("DAYBOOK_API_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            },
            store: StoreSettings {
                outcome_timeout_secs: env::var("DAYBOOK_OUTCOME_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
                shutdown_timeout_secs: env::var("DAYBOOK_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                broadcast_capacity: env::var("DAYBOOK_BROADCAST_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(64),
            },
            log: LogConfig {
                filter: env::var("RUST_LOG").unwrap_or_else(|_| "daybook=info".to_string()),
            },
        }
    }

    /// Client settings for the todo service
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api.base_url.clone())
    }

    /// Runtime settings for the store
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_broadcast_capacity(self.store.broadcast_capacity)
            .with_shutdown_timeout(self.shutdown_timeout())
    }

    /// How long a caller waits for the outcome of a request
    #[must_use]
    pub const fn outcome_timeout(&self) -> Duration {
        Duration::from_secs(self.store.outcome_timeout_secs)
    }

    /// How long shutdown waits for in-flight requests
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.store.shutdown_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            store: StoreSettings {
                outcome_timeout_secs: 30,
                shutdown_timeout_secs: 5,
                broadcast_capacity: 64,
            },
            log: LogConfig {
                filter: "daybook=info".to_string(),
            },
        }
    }
}
