//! Shared error definitions for the OPA client.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::rest::{RestReturn, TransportError};

/// Result alias used throughout the client.
pub type Result<T> = std::result::Result<T, Error>;

/// Known failure kinds that the normalizer folds into [`Error::Failure`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// Network or HTTP request failure (connect, timeout, protocol).
    Request,
    /// A referenced file or socket path does not exist.
    MissingFile,
    /// A resource that must not exist already does.
    FileExists,
    /// Input ended before a complete value was read.
    EndOfInput,
    /// An index addressed past the end of a sequence.
    IndexOutOfRange,
    /// JSON text could not be parsed or did not have the expected shape.
    MalformedJson,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request failed",
            Self::MissingFile => "file not found",
            Self::FileExists => "file already exists",
            Self::EndOfInput => "unexpected end of input",
            Self::IndexOutOfRange => "index out of range",
            Self::MalformedJson => "malformed json",
        })
    }
}

/// Errors returned by every public client operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A known low-level failure, normalized from the transport or a parser.
    #[error("{kind}: {message}")]
    Failure {
        /// Category of the failure.
        kind: FailureKind,
        /// Description taken from the underlying failure.
        message: String,
    },

    /// An argument was rejected before any request was sent.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the offending argument.
        reason: String,
    },

    /// The server refused to create the policy or document at the target address.
    #[error("invalid target address: {message}")]
    InvalidTargetAddress {
        /// Message reported by the server.
        message: String,
    },

    /// The server answered with an unexpected HTTP status.
    #[error("http error: {message}")]
    Http {
        /// Status returned by the server, absent if none was reported.
        status: Option<StatusCode>,
        /// Message reported by the server.
        message: String,
    },

    /// The addressed resource does not exist or rejected the operation.
    #[error("missing resource: {message}")]
    MissingResource {
        /// Message reported by the server.
        message: String,
    },

    /// Client configuration is invalid.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// Reason describing the invalid value.
        reason: String,
    },

    /// Transport failure outside the known set, passed through untouched.
    #[error(transparent)]
    Transport(TransportError),
}

impl Error {
    /// Convenience constructor for known failures.
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Convenience constructor for invalid arguments.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns the failure kind when this is a normalized known failure.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Renders the error in the uniform result shape (`success == false`).
    #[must_use]
    pub fn to_rest_return(&self) -> RestReturn {
        let status = match self {
            Self::Http { status, .. } => *status,
            _ => None,
        };
        RestReturn::failure(status, self.to_string())
    }
}
