//! Logging bootstrap for binaries built on the OPA client.
//!
//! The libraries only emit `tracing` events; installing a subscriber is left to
//! the application, which can call [`init`] once at startup.

#![warn(missing_docs, clippy::pedantic)]

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Builds the event filter, preferring `RUST_LOG` over `default_directive`.
#[must_use]
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs a global fmt subscriber filtered by [`env_filter`].
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already installed.
pub fn init(default_directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter(default_directive))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        let _ = init(DEFAULT_DIRECTIVE);
        assert!(init("debug").is_err());
    }
}
