//! Transport-neutral request and result values.
//!
//! A transport receives a [`RestRequest`] and reports ordinary HTTP outcomes,
//! including error statuses, as a [`RestReturn`]. Only failures below HTTP
//! surface as [`TransportError`].

use std::io;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::{Error, Result};

/// Content type used for policy text uploads.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// Content type used for JSON documents.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type used for JSON-Patch bodies.
pub const CONTENT_TYPE_JSON_PATCH: &str = "application/json-patch+json";

/// A single HTTP request issued by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestRequest {
    method: Method,
    url: String,
    content_type: Option<&'static str>,
    body: Bytes,
}

impl RestRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Builds a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Builds a `PUT` request with the supplied body.
    #[must_use]
    pub fn put(url: impl Into<String>, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self::new(Method::PUT, url).with_body(content_type, body)
    }

    /// Builds a `PATCH` request with the supplied body.
    #[must_use]
    pub fn patch(
        url: impl Into<String>,
        content_type: &'static str,
        body: impl Into<Bytes>,
    ) -> Self {
        Self::new(Method::PATCH, url).with_body(content_type, body)
    }

    /// Builds a `DELETE` request.
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.content_type = Some(content_type);
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the absolute target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the content type of the body, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Uniform outcome of one network operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestReturn {
    success: bool,
    http_status: Option<StatusCode>,
    message: String,
    payload: Option<Bytes>,
}

impl RestReturn {
    /// Builds a result from an HTTP response. Success means a `2xx` status.
    #[must_use]
    pub fn from_response(status: StatusCode, body: Bytes) -> Self {
        let success = status.is_success();
        let message = if success {
            status.canonical_reason().unwrap_or("OK").to_owned()
        } else {
            server_message(status, &body)
        };
        let payload = (!body.is_empty()).then_some(body);
        Self {
            success,
            http_status: Some(status),
            message,
            payload,
        }
    }

    /// Successful result carrying only a message.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            http_status: Some(StatusCode::OK),
            message: message.into(),
            payload: None,
        }
    }

    /// Failed result, optionally tied to an HTTP status.
    #[must_use]
    pub fn failure(http_status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            http_status,
            message: message.into(),
            payload: None,
        }
    }

    /// Returns true when the operation succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Returns the HTTP status, absent when no response was received.
    #[must_use]
    pub const fn http_status(&self) -> Option<StatusCode> {
        self.http_status
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the raw response payload.
    #[must_use]
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Deserializes the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`FailureKind::MalformedJson`](crate::FailureKind::MalformedJson)
    /// failure when the payload is missing or does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self.payload.as_deref().unwrap_or_default();
        Ok(serde_json::from_slice(payload)?)
    }
}

#[derive(Deserialize)]
struct ServerError {
    message: String,
}

fn server_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ServerError>(body) {
        return parsed.message;
    }
    let text = String::from_utf8_lossy(body).trim().to_owned();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_owned()
    } else {
        text
    }
}

/// Failures raised by a transport below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {reason}")]
    Connect {
        /// Additional context about the failure.
        reason: String,
    },

    /// No response arrived before the configured deadline.
    #[error("request timed out")]
    Timeout,

    /// The response ended before a complete message was read.
    #[error("incomplete message: {reason}")]
    IncompleteMessage {
        /// Additional context about the failure.
        reason: String,
    },

    /// HTTP framing or protocol violation.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Additional context about the failure.
        reason: String,
    },

    /// The request could not be constructed from the supplied values.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Description of the offending value.
        reason: String,
    },

    /// Operating-system level I/O failure.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: io::Error,
    },
}

impl TransportError {
    /// Convenience constructor for connection failures.
    #[must_use]
    pub fn connect(reason: impl Into<String>) -> Self {
        Self::Connect {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for protocol failures.
    #[must_use]
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

impl From<&Error> for RestReturn {
    fn from(err: &Error) -> Self {
        err.to_rest_return()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_follows_status_class() {
        let ok = RestReturn::from_response(StatusCode::NO_CONTENT, Bytes::new());
        assert!(ok.success());
        assert_eq!(ok.http_status(), Some(StatusCode::NO_CONTENT));
        assert!(ok.payload().is_none());

        let missing = RestReturn::from_response(StatusCode::NOT_FOUND, Bytes::new());
        assert!(!missing.success());
        assert_eq!(missing.message(), "Not Found");
    }

    #[test]
    fn failure_message_prefers_server_error_object() {
        let body = Bytes::from_static(
            br#"{"code":"invalid_parameter","message":"error(s) occurred while compiling module(s)"}"#,
        );
        let result = RestReturn::from_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            result.message(),
            "error(s) occurred while compiling module(s)"
        );
        assert!(result.payload().is_some());
    }

    #[test]
    fn failure_message_falls_back_to_body_text() {
        let result =
            RestReturn::from_response(StatusCode::BAD_GATEWAY, Bytes::from_static(b" upstream down\n"));
        assert_eq!(result.message(), "upstream down");
    }

    #[test]
    fn json_payload_decoding_reports_malformed_json() {
        let result = RestReturn::from_response(StatusCode::OK, Bytes::from_static(b"{\"result\":"));
        let err = result
            .json::<serde_json::Value>()
            .expect_err("truncated json must fail");
        assert_eq!(err.failure_kind(), Some(crate::FailureKind::MalformedJson));
    }

    #[test]
    fn request_builders_set_body_and_type() {
        let request = RestRequest::put("http://localhost:8181/v1/data/x", CONTENT_TYPE_JSON, "{}");
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.content_type(), Some(CONTENT_TYPE_JSON));
        assert_eq!(request.body().as_ref(), b"{}");

        let request = RestRequest::delete("http://localhost:8181/v1/policies/x");
        assert!(request.content_type().is_none());
        assert!(request.body().is_empty());
    }
}
