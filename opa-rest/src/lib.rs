//! OPA REST client SDK facade.
//!
//! Depend on this crate via `cargo add opa-rest`. It bundles the workspace
//! crates behind feature flags so downstream users can leave out the pieces
//! they do not need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use opa_primitives as primitives;

/// Connection configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use opa_config as config;

/// Client façade and resource handles (enabled by `client` feature).
#[cfg(feature = "client")]
pub use opa_client as client;

/// Logging bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use opa_telemetry as telemetry;

#[cfg(feature = "client")]
pub use opa_client::{Data, OpaClient, Policy};
