//! Handle for a policy accepted by the server.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use opa_primitives::{Error, RestRequest, RestReturn, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::transport::RestTransport;

/// Version assigned to every policy created by this client.
pub const INITIAL_POLICY_VERSION: u32 = 1;

/// A named policy known to exist on the server.
///
/// Only [`OpaClient::create_policy`](crate::OpaClient::create_policy) produces
/// handles. [`Policy::delete`] consumes the handle, and the handle cannot be
/// cloned, so a deleted policy has no remaining handle.
///
/// ```compile_fail
/// # async fn reuse(policy: opa_client::Policy) {
/// let _ = policy.delete().await;
/// let _ = policy.fetch_source().await;
/// # }
/// ```
///
/// ```compile_fail
/// fn copy(policy: &opa_client::Policy) -> opa_client::Policy {
///     policy.clone()
/// }
/// ```
pub struct Policy {
    name: String,
    url: String,
    imports: Vec<String>,
    version: u32,
    transport: Arc<dyn RestTransport>,
    accept_any_success_on_delete: bool,
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("imports", &self.imports)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Policy {
    pub(crate) fn new(
        name: String,
        url: String,
        imports: Vec<String>,
        transport: Arc<dyn RestTransport>,
        accept_any_success_on_delete: bool,
    ) -> Self {
        Self {
            name,
            url,
            imports,
            version: INITIAL_POLICY_VERSION,
            transport,
            accept_any_success_on_delete,
        }
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the policies collection URL the policy lives under.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the imported data packages in declaration order.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Returns the policy version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    fn target(&self) -> String {
        format!("{}{}", self.url, self.name)
    }

    /// Deletes the policy from the server.
    ///
    /// Only `200 OK` counts as success unless the client was configured to
    /// accept any `2xx` status on delete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] carrying the server's message when the status is
    /// not accepted, and a normalized transport error when the request cannot
    /// be completed.
    pub async fn delete(self) -> Result<RestReturn> {
        let target = self.target();
        debug!(policy = %self.name, url = %target, "deleting policy");

        let result = self.transport.send(RestRequest::delete(target)).await?;
        let accepted = if self.accept_any_success_on_delete {
            result.success()
        } else {
            result.http_status() == Some(StatusCode::OK)
        };
        if !accepted {
            warn!(
                policy = %self.name,
                status = ?result.http_status(),
                message = result.message(),
                "policy delete rejected"
            );
            return Err(Error::Http {
                status: result.http_status(),
                message: result.message().to_owned(),
            });
        }

        info!(policy = %self.name, "policy deleted");
        Ok(RestReturn::ok("Policy Deleted"))
    }

    /// Fetches the policy text currently stored on the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] when the server no longer knows the
    /// policy, [`Error::Http`] for other non-success statuses, and a malformed
    /// JSON failure if the response cannot be decoded.
    pub async fn fetch_source(&self) -> Result<String> {
        let target = self.target();
        debug!(policy = %self.name, url = %target, "fetching policy");

        let result = self.transport.send(RestRequest::get(target)).await?;
        if !result.success() {
            return Err(read_failure(&result));
        }
        let envelope: PolicyEnvelope = result.json()?;
        Ok(envelope.result.raw)
    }
}

#[derive(Deserialize)]
struct PolicyEnvelope {
    result: PolicyModule,
}

#[derive(Deserialize)]
struct PolicyModule {
    raw: String,
}

pub(crate) fn read_failure(result: &RestReturn) -> Error {
    if result.http_status() == Some(StatusCode::NOT_FOUND) {
        Error::MissingResource {
            message: result.message().to_owned(),
        }
    } else {
        Error::Http {
            status: result.http_status(),
            message: result.message().to_owned(),
        }
    }
}
