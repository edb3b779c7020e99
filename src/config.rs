//! Client configuration.
//!
//! `Configuration` holds the static settings consumed by [`crate::Client`]
//! and [`crate::telemetry::Session`] at initialization: backend endpoint,
//! credentials, and batching thresholds. It carries no behavior of its own.

use serde::{Deserialize, Serialize};

/// Default collection endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.agentops.ai";

/// Default maximum delay before a partial batch is flushed, in milliseconds.
pub const DEFAULT_MAX_WAIT_TIME_MS: u64 = 5_000;

/// Default maximum batch size.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 512;

/// Static client configuration.
///
/// Consumed read-only by sessions and their batch processors. Defaults can
/// be overridden per-field with the `with_*` builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// Base URL of the collection backend (no trailing slash required).
    pub endpoint: String,
    /// API key sent with session registration.
    pub api_key: Option<String>,
    /// Optional parent organization key.
    pub parent_key: Option<String>,
    /// Maximum time a record may sit unflushed, in milliseconds.
    pub max_wait_time: u64,
    /// Maximum number of records exported in one batch.
    pub max_queue_size: usize,
    /// Whether `Client::init` starts the session immediately.
    pub auto_start_sessions: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        let endpoint = std::env::var("AGENTOPS_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let api_key = std::env::var("AGENTOPS_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        Configuration {
            endpoint,
            api_key,
            parent_key: None,
            max_wait_time: DEFAULT_MAX_WAIT_TIME_MS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            auto_start_sessions: true,
        }
    }
}

impl Configuration {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = Some(parent_key.into());
        self
    }

    /// Maximum delay before a partial batch is flushed, in milliseconds.
    pub fn with_max_wait_time(mut self, millis: u64) -> Self {
        self.max_wait_time = millis;
        self
    }

    /// Maximum number of records exported in one batch.
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    pub fn with_auto_start_sessions(mut self, auto_start: bool) -> Self {
        self.auto_start_sessions = auto_start;
        self
    }
}
