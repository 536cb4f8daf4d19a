//! Core shared types for the OPA REST client.

#![warn(missing_docs, clippy::pedantic)]

mod document;
mod error;
mod names;
mod normalize;
mod patch;
mod rest;

/// Policy document text generation.
pub use document::{DEFAULT_RULE, PolicyDocument};
/// Error type and result alias shared across the client.
pub use error::{Error, FailureKind, Result};
/// Name and path validation applied before requests are built.
pub use names::{validate_name, validate_path};
/// JSON-Patch operations for base documents.
pub use patch::{PatchOp, PatchOperation};
/// Transport-neutral request and result values.
pub use rest::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_JSON_PATCH, CONTENT_TYPE_TEXT, RestRequest, RestReturn,
    TransportError,
};
