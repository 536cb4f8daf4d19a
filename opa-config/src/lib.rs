//! Connection settings for the OPA REST client.
//!
//! [`OpaConfig`] can be built in code with chained `with_*` calls, loaded from
//! `OPA_*` environment variables, or deserialized as part of a larger
//! configuration file.

#![warn(missing_docs, clippy::pedantic)]

use std::env;
use std::time::Duration;

use opa_primitives::{Error, Result};
use serde::Deserialize;
use tracing::debug;

/// Environment variable holding the server host.
pub const OPA_SERVER_ENV: &str = "OPA_SERVER";
/// Environment variable holding the server port.
pub const OPA_PORT_ENV: &str = "OPA_PORT";
/// Environment variable holding the URL scheme (`http` or `https`).
pub const OPA_SCHEME_ENV: &str = "OPA_SCHEME";
/// Environment variable holding the REST API version segment.
pub const OPA_API_VERSION_ENV: &str = "OPA_API_VERSION";
/// Environment variable holding the request timeout in seconds.
pub const OPA_TIMEOUT_SECS_ENV: &str = "OPA_TIMEOUT_SECS";
/// Environment variable enabling lenient delete status handling.
pub const OPA_ACCEPT_ANY_DELETE_STATUS_ENV: &str = "OPA_ACCEPT_ANY_DELETE_STATUS";

const DEFAULT_SERVER: &str = "localhost";
const DEFAULT_PORT: u16 = 8181;
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings used to address the policy server.
///
/// Deserialized values go through the same checks as the `with_*` builders.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOpaConfig")]
pub struct OpaConfig {
    server: String,
    port: u16,
    scheme: String,
    api_version: String,
    timeout_secs: u64,
    accept_any_success_on_delete: bool,
}

impl Default for OpaConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            port: DEFAULT_PORT,
            scheme: DEFAULT_SCHEME.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_any_success_on_delete: false,
        }
    }
}

/// Unchecked shape of [`OpaConfig`] as it appears in configuration files.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawOpaConfig {
    server: String,
    port: u16,
    scheme: String,
    api_version: String,
    timeout_secs: u64,
    accept_any_success_on_delete: bool,
}

impl Default for RawOpaConfig {
    fn default() -> Self {
        let OpaConfig {
            server,
            port,
            scheme,
            api_version,
            timeout_secs,
            accept_any_success_on_delete,
        } = OpaConfig::default();
        Self {
            server,
            port,
            scheme,
            api_version,
            timeout_secs,
            accept_any_success_on_delete,
        }
    }
}

impl TryFrom<RawOpaConfig> for OpaConfig {
    type Error = Error;

    fn try_from(raw: RawOpaConfig) -> Result<Self> {
        Ok(Self::default()
            .with_server(raw.server)?
            .with_port(raw.port)?
            .with_scheme(raw.scheme)?
            .with_api_version(raw.api_version)?
            .with_timeout(Duration::from_secs(raw.timeout_secs))?
            .with_accept_any_success_on_delete(raw.accept_any_success_on_delete))
    }
}

impl OpaConfig {
    /// Creates a configuration for the supplied host using default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the host is empty or malformed.
    pub fn new(server: impl Into<String>) -> Result<Self> {
        Self::default().with_server(server)
    }

    /// Loads settings from the `OPA_*` environment variables, falling back to
    /// defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(server) = lookup(OPA_SERVER_ENV) {
            cfg = cfg.with_server(server)?;
        }
        if let Some(port) = lookup(OPA_PORT_ENV) {
            let port = port.trim().parse::<u16>().map_err(|err| {
                Error::configuration(format!("{OPA_PORT_ENV} is not a valid port: {err}"))
            })?;
            cfg = cfg.with_port(port)?;
        }
        if let Some(scheme) = lookup(OPA_SCHEME_ENV) {
            cfg = cfg.with_scheme(scheme)?;
        }
        if let Some(version) = lookup(OPA_API_VERSION_ENV) {
            cfg = cfg.with_api_version(version)?;
        }
        if let Some(secs) = lookup(OPA_TIMEOUT_SECS_ENV) {
            let secs = secs.trim().parse::<u64>().map_err(|err| {
                Error::configuration(format!("{OPA_TIMEOUT_SECS_ENV} is not a number: {err}"))
            })?;
            cfg = cfg.with_timeout(Duration::from_secs(secs))?;
        }
        if let Some(flag) = lookup(OPA_ACCEPT_ANY_DELETE_STATUS_ENV) {
            cfg = cfg.with_accept_any_success_on_delete(parse_flag(&flag)?);
        }
        debug!(base_url = %cfg.base_url(), "loaded OPA client configuration");
        Ok(cfg)
    }

    /// Overrides the server host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the host is empty or contains a
    /// scheme, path, or whitespace.
    pub fn with_server(mut self, server: impl Into<String>) -> Result<Self> {
        let server = server.into().trim().to_owned();
        if server.is_empty() {
            return Err(Error::configuration("server host cannot be empty"));
        }
        if server.contains("://") || server.contains('/') || server.contains(char::is_whitespace)
        {
            return Err(Error::configuration(format!(
                "server `{server}` must be a bare host name or address"
            )));
        }
        self.server = server;
        Ok(self)
    }

    /// Overrides the server port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the port is zero.
    pub fn with_port(mut self, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(Error::configuration("port must be non-zero"));
        }
        self.port = port;
        Ok(self)
    }

    /// Overrides the URL scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless the scheme is `http` or `https`.
    pub fn with_scheme(mut self, scheme: impl AsRef<str>) -> Result<Self> {
        let scheme = scheme.as_ref().trim().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(Error::configuration(format!(
                "scheme must be http or https, got `{scheme}`"
            )));
        }
        self.scheme = scheme;
        Ok(self)
    }

    /// Overrides the REST API version segment (for example `v1`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the segment is empty or contains `/`.
    pub fn with_api_version(mut self, version: impl AsRef<str>) -> Result<Self> {
        let version = version.as_ref().trim().trim_matches('/');
        if version.is_empty() || version.contains('/') {
            return Err(Error::configuration(format!(
                "api version `{version}` must be a single path segment"
            )));
        }
        version.clone_into(&mut self.api_version);
        Ok(self)
    }

    /// Sets the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the timeout is shorter than one second.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.as_secs() == 0 {
            return Err(Error::configuration("timeout must be at least one second"));
        }
        self.timeout_secs = timeout.as_secs();
        Ok(self)
    }

    /// Accepts any `2xx` status on policy deletion instead of only `200 OK`.
    ///
    /// Some deployments answer deletes with `204 No Content`; the default is
    /// strict.
    #[must_use]
    pub fn with_accept_any_success_on_delete(mut self, accept: bool) -> Self {
        self.accept_any_success_on_delete = accept;
        self
    }

    /// Returns the server host.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the REST API version segment.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns true when deletes accept any `2xx` status.
    #[must_use]
    pub const fn accept_any_success_on_delete(&self) -> bool {
        self.accept_any_success_on_delete
    }

    /// Returns the versioned API root, always ending with `/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{}/",
            self.scheme, self.server, self.port, self.api_version
        )
    }

    /// Returns the policies collection URL.
    #[must_use]
    pub fn policies_url(&self) -> String {
        format!("{}policies/", self.base_url())
    }

    /// Returns the data collection URL.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("{}data/", self.base_url())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::configuration(format!(
            "{OPA_ACCEPT_ANY_DELETE_STATUS_ENV} must be a boolean, got `{other}`"
        ))),
    }
}
