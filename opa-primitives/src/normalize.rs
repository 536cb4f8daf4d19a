//! Folds transport and parser failures into [`Error`].
//!
//! Every public client operation propagates failures with `?`, so these
//! conversions are the single point where low-level failures are classified.
//! Known kinds become [`Error::Failure`], invalid request values become
//! [`Error::InvalidArgument`], and anything else is passed through as
//! [`Error::Transport`] without modification.

use std::io;

use crate::error::{Error, FailureKind};
use crate::rest::TransportError;

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { .. }
            | TransportError::Timeout
            | TransportError::Protocol { .. } => {
                Error::failure(FailureKind::Request, err.to_string())
            }
            TransportError::IncompleteMessage { .. } => {
                Error::failure(FailureKind::EndOfInput, err.to_string())
            }
            TransportError::InvalidRequest { reason } => Error::InvalidArgument { reason },
            TransportError::Io { source } => match io_failure_kind(&source) {
                Some(kind) => Error::failure(kind, source.to_string()),
                None => Error::Transport(TransportError::Io { source }),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        // Truncated documents count as malformed too.
        Error::failure(FailureKind::MalformedJson, err.to_string())
    }
}

fn io_failure_kind(err: &io::Error) -> Option<FailureKind> {
    match err.kind() {
        io::ErrorKind::NotFound => Some(FailureKind::MissingFile),
        io::ErrorKind::AlreadyExists => Some(FailureKind::FileExists),
        io::ErrorKind::UnexpectedEof => Some(FailureKind::EndOfInput),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::TimedOut => Some(FailureKind::Request),
        _ => None,
    }
}
