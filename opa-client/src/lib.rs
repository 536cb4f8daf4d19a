//! REST client for Open Policy Agent style policy servers.
//!
//! [`OpaClient`] uploads policies and base documents and hands back
//! [`Policy`] and [`Data`] handles for follow-up operations. All network
//! traffic goes through a [`RestTransport`]; [`HyperTransport`] is the default.

#![warn(missing_docs, clippy::pedantic)]

pub mod transport;

mod client;
mod data;
mod policy;

#[cfg(test)]
mod testing;

pub use client::OpaClient;
pub use data::Data;
pub use policy::{INITIAL_POLICY_VERSION, Policy};
pub use transport::{HyperTransport, RestTransport, TransportResult};

/// Re-export of the configuration type accepted by [`OpaClient::new`].
pub use opa_config::OpaConfig;
/// Re-export of the shared error and result types.
pub use opa_primitives::{Error, FailureKind, Result, RestReturn};
