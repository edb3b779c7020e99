//! Logging setup.
//!
//! The SDK emits structured diagnostics through the `tracing` macros. Host
//! applications that already install a subscriber can ignore this module;
//! `init_logging` is a convenience for programs that have none.

use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber.
///
/// The filter is read from `AGENTOPS_LOG`, then `RUST_LOG`, then falls back
/// to `info`. Calling this more than once, or after another subscriber is
/// installed, is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("AGENTOPS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
