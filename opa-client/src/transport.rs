//! REST transport seam and its hyper-backed implementation.

use std::error::Error as StdError;
use std::sync::Arc;
use std::{fmt, io, time::Duration};

use async_trait::async_trait;
use http::StatusCode;
use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use opa_config::OpaConfig;
use opa_primitives::{Error, RestRequest, RestReturn, TransportError};
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Generic HTTP helper used by the client and its resource handles.
///
/// Implementations report every HTTP response, including error statuses, as a
/// [`RestReturn`] whose `success` flag reflects a `2xx` status. Only failures
/// below HTTP (connect, timeout, framing) are returned as [`TransportError`].
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Sends one request and waits for the complete response.
    async fn send(&self, request: RestRequest) -> TransportResult<RestReturn>;
}

/// [`RestTransport`] backed by a hyper client.
pub struct HyperTransport {
    client: HyperClient,
    scheme: String,
    timeout: Duration,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("scheme", &self.scheme)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Creates a transport for the configured scheme whose requests are
    /// bounded by the configured timeout.
    ///
    /// An `https` configuration never falls back to plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a scheme other than `http` or
    /// `https`.
    pub fn new(config: &OpaConfig) -> opa_primitives::Result<Self> {
        let connector = https_connector(config.scheme())?;
        Ok(Self {
            client: Client::builder().build::<_, Body>(connector),
            scheme: config.scheme().to_owned(),
            timeout: config.timeout(),
        })
    }

    fn build_request(request: &RestRequest) -> TransportResult<Request<Body>> {
        let uri = request.url().parse::<Uri>().map_err(|err| {
            TransportError::invalid_request(format!("invalid url `{}`: {err}", request.url()))
        })?;
        let method = hyper::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|err| TransportError::invalid_request(format!("invalid method: {err}")))?;

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = request.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder
            .body(Body::from(request.body().clone()))
            .map_err(|err| TransportError::invalid_request(format!("failed to build request: {err}")))
    }
}

#[async_trait]
impl RestTransport for HyperTransport {
    async fn send(&self, request: RestRequest) -> TransportResult<RestReturn> {
        let req = Self::build_request(&request)?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(classify)?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|err| TransportError::protocol(format!("invalid status code: {err}")))?;
        let body = timeout(self.timeout, to_bytes(response.into_body()))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(classify)?;

        debug!(%status, bytes = body.len(), "received response");
        Ok(RestReturn::from_response(status, body))
    }
}

fn https_connector(scheme: &str) -> opa_primitives::Result<HttpsConnector<HttpConnector>> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));
    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let builder = HttpsConnectorBuilder::new().with_tls_config(tls);
    let builder = match scheme {
        "http" => builder.https_or_http(),
        "https" => builder.https_only(),
        other => {
            return Err(Error::configuration(format!(
                "no transport for scheme `{other}`"
            )));
        }
    };

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    Ok(builder.enable_http1().wrap_connector(http))
}

fn classify(err: hyper::Error) -> TransportError {
    let reason = describe(&err);
    if err.is_connect() {
        TransportError::connect(reason)
    } else if err.is_incomplete_message() {
        TransportError::IncompleteMessage { reason }
    } else if err.is_timeout() {
        TransportError::Timeout
    } else if let Some(io_err) = io_source(&err) {
        TransportError::from(io::Error::new(io_err.kind(), reason))
    } else {
        TransportError::protocol(reason)
    }
}

fn describe(err: &hyper::Error) -> String {
    match err.source() {
        Some(cause) => format!("{err}: {cause}"),
        None => err.to_string(),
    }
}

fn io_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = cause.source();
    }
    None
}
