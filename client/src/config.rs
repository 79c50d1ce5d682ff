//! Client configuration loaded from the environment

use std::env;

/// Base URL used when `DAYBOOK_API_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";

/// Connection settings for [`crate::HttpTodoApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the todo service, without a trailing slash
    pub base_url: String,
}

impl ClientConfig {
    /// Create a configuration for an explicit base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Load configuration from `DAYBOOK_API_URL`, falling back to the local default
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(env::var("DAYBOOK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
