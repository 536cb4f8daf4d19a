//! Handle for a base document accepted by the server.

use std::fmt;
use std::sync::Arc;

use opa_primitives::{
    CONTENT_TYPE_JSON_PATCH, Error, FailureKind, PatchOperation, RestRequest, RestReturn, Result,
    validate_path,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::policy::read_failure;
use crate::transport::RestTransport;

/// A named base document known to exist on the server.
///
/// The handle keeps the document text last known to be accepted by the
/// server. Patches change the server-side document without echoing it back,
/// so a successful patch clears the snapshot until [`Data::refresh`] reloads
/// it.
#[derive(Clone)]
pub struct Data {
    name: String,
    url: String,
    json_data: Option<String>,
    transport: Arc<dyn RestTransport>,
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("json_data", &self.json_data)
            .finish_non_exhaustive()
    }
}

impl Data {
    pub(crate) fn new(
        name: String,
        url: String,
        json_data: String,
        transport: Arc<dyn RestTransport>,
    ) -> Self {
        Self {
            name,
            url,
            json_data: Some(json_data),
            transport,
        }
    }

    /// Returns the document name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data collection URL the document lives under.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the cached document text, or `None` after a patch made it stale.
    #[must_use]
    pub fn json_data(&self) -> Option<&str> {
        self.json_data.as_deref()
    }

    /// Looks up a JSON pointer (`""` for the whole document) in the snapshot.
    ///
    /// Returns `Ok(None)` when an object key along the pointer is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] when the snapshot is stale,
    /// [`FailureKind::IndexOutOfRange`] when an array index is past the end,
    /// and [`Error::InvalidArgument`] for a malformed pointer.
    pub fn snapshot_at(&self, pointer: &str) -> Result<Option<Value>> {
        let text = self.json_data.as_deref().ok_or_else(|| Error::MissingResource {
            message: format!("snapshot of `{}` is stale; refresh it first", self.name),
        })?;
        let document: Value = serde_json::from_str(text)?;
        Ok(resolve(&document, pointer)?.cloned())
    }

    /// Adds `value` at `path` below this document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a malformed path,
    /// [`Error::MissingResource`] when the server rejects the patch, and a
    /// normalized transport error when the request cannot be completed.
    pub async fn add_path(&mut self, path: &str, value: impl Into<Value>) -> Result<RestReturn> {
        self.patch(PatchOperation::add(path, value.into()), "Added successfully")
            .await
    }

    /// Removes the value at `path` below this document.
    ///
    /// # Errors
    ///
    /// Same as [`Data::add_path`].
    pub async fn remove_path(&mut self, path: &str) -> Result<RestReturn> {
        self.patch(PatchOperation::remove(path), "Removed successfully")
            .await
    }

    async fn patch(&mut self, operation: PatchOperation, done: &str) -> Result<RestReturn> {
        validate_path(operation.path())?;
        let target = format!("{}{}{}", self.url, self.name, operation.path());
        let body = serde_json::to_vec(&[&operation])?;

        debug!(document = %self.name, op = ?operation.op(), url = %target, "patching base document");
        let result = self
            .transport
            .send(RestRequest::patch(target, CONTENT_TYPE_JSON_PATCH, body))
            .await?;
        if !result.success() {
            warn!(
                document = %self.name,
                status = ?result.http_status(),
                message = result.message(),
                "patch rejected"
            );
            return Err(Error::MissingResource {
                message: result.message().to_owned(),
            });
        }

        self.json_data = None;
        info!(document = %self.name, path = operation.path(), "base document patched");
        Ok(RestReturn::ok(done))
    }

    /// Re-fetches the document from the server and replaces the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] when the document is unknown or
    /// undefined, [`Error::Http`] for other non-success statuses, and a
    /// malformed JSON failure if the response cannot be decoded.
    pub async fn refresh(&mut self) -> Result<&str> {
        let target = format!("{}{}", self.url, self.name);
        debug!(document = %self.name, url = %target, "refreshing base document");

        let result = self.transport.send(RestRequest::get(target)).await?;
        if !result.success() {
            return Err(read_failure(&result));
        }
        let envelope: DataEnvelope = result.json()?;
        let document = envelope.result.ok_or_else(|| Error::MissingResource {
            message: format!("base document `{}` is undefined", self.name),
        })?;

        let text = serde_json::to_string(&document)?;
        Ok(self.json_data.insert(text).as_str())
    }
}

#[derive(Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    result: Option<Value>,
}

fn resolve<'a>(document: &'a Value, pointer: &str) -> Result<Option<&'a Value>> {
    if let Some(found) = document.pointer(pointer) {
        return Ok(Some(found));
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(Error::invalid_argument(format!(
            "pointer `{pointer}` must start with `/`"
        )));
    };

    // `pointer` only says "absent"; walk again to tell a bad index apart.
    let mut current = document;
    for raw in rest.split('/') {
        let token = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => match map.get(&token) {
                Some(value) => value,
                None => return Ok(None),
            },
            Value::Array(items) => {
                let index = array_index(&token)?;
                items.get(index).ok_or_else(|| {
                    Error::failure(
                        FailureKind::IndexOutOfRange,
                        format!("index {index} is past the end of an array of {}", items.len()),
                    )
                })?
            }
            _ => return Ok(None),
        };
    }
    Ok(None)
}

fn array_index(token: &str) -> Result<usize> {
    let canonical = token == "0" || (!token.starts_with('0') && !token.starts_with('+'));
    match token.parse::<usize>() {
        Ok(index) if canonical => Ok(index),
        _ => Err(Error::invalid_argument(format!(
            "`{token}` is not an array index"
        ))),
    }
}
