//! Entry point that creates policies and base documents on the server.

use std::fmt;
use std::sync::Arc;

use opa_config::OpaConfig;
use opa_primitives::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, Error, PolicyDocument, RestRequest, RestReturn, Result,
    validate_name,
};
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

use crate::data::Data;
use crate::policy::Policy;
use crate::transport::{HyperTransport, RestTransport};

/// Client façade for a policy server's REST API.
///
/// The façade only issues create calls; everything else happens through the
/// returned [`Policy`] and [`Data`] handles.
#[derive(Clone)]
pub struct OpaClient {
    config: OpaConfig,
    transport: Arc<dyn RestTransport>,
}

impl fmt::Debug for OpaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaClient")
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

impl OpaClient {
    /// Creates a client that talks to the configured server over hyper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: OpaConfig) -> Result<Self> {
        let transport = HyperTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client on top of an existing transport.
    #[must_use]
    pub fn with_transport(config: OpaConfig, transport: Arc<dyn RestTransport>) -> Self {
        Self { config, transport }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &OpaConfig {
        &self.config
    }

    /// Assembles the policy document that [`OpaClient::create_policy`] uploads.
    #[must_use]
    pub fn policy_document<I, S>(name: &str, rule_body: &str, imports: I) -> PolicyDocument
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PolicyDocument::new(name, rule_body).with_imports(imports)
    }

    /// Uploads a policy whose `allow` rule is `rule_body`, importing each of
    /// `imports` from `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an invalid name,
    /// [`Error::InvalidTargetAddress`] when the server rejects the upload, and
    /// a normalized transport error when the request cannot be completed.
    pub async fn create_policy<I, S>(
        &self,
        name: &str,
        rule_body: &str,
        imports: I,
    ) -> Result<Policy>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_name(name)?;
        let document = Self::policy_document(name, rule_body, imports);
        let url = self.config.policies_url();
        let target = format!("{url}{name}");

        debug!(policy = name, url = %target, "uploading policy");
        let result = self
            .transport
            .send(RestRequest::put(target, CONTENT_TYPE_TEXT, document.render()))
            .await?;
        ensure_created(&result, "policy", name)?;

        info!(policy = name, imports = document.imports().len(), "policy created");
        Ok(Policy::new(
            name.to_owned(),
            url,
            document.imports().to_vec(),
            Arc::clone(&self.transport),
            self.config.accept_any_success_on_delete(),
        ))
    }

    /// Uploads `json_payload` as the base document `name`.
    ///
    /// The payload is sent byte-for-byte and kept as the handle's snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`FailureKind::MalformedJson`](opa_primitives::FailureKind)
    /// failure if the payload is not valid JSON, [`Error::InvalidArgument`] for
    /// an invalid name, and [`Error::InvalidTargetAddress`] when the server
    /// rejects the upload.
    pub async fn create_base_document(
        &self,
        name: &str,
        json_payload: impl Into<String>,
    ) -> Result<Data> {
        validate_name(name)?;
        let payload = json_payload.into();
        serde_json::from_str::<IgnoredAny>(&payload)?;

        let url = self.config.data_url();
        let target = format!("{url}{name}");

        debug!(document = name, url = %target, "uploading base document");
        let result = self
            .transport
            .send(RestRequest::put(
                target,
                CONTENT_TYPE_JSON,
                payload.clone().into_bytes(),
            ))
            .await?;
        ensure_created(&result, "base document", name)?;

        info!(document = name, "base document created");
        Ok(Data::new(
            name.to_owned(),
            url,
            payload,
            Arc::clone(&self.transport),
        ))
    }
}

fn ensure_created(result: &RestReturn, kind: &str, name: &str) -> Result<()> {
    if result.success() {
        return Ok(());
    }
    warn!(
        %kind,
        name,
        status = ?result.http_status(),
        message = result.message(),
        "server rejected upload"
    );
    Err(Error::InvalidTargetAddress {
        message: result.message().to_owned(),
    })
}
