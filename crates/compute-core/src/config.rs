//! Configuration structures for compute connections.
//!
//! This module provides [`ConnectionConfig`], the immutable set of inputs a
//! [`Connection`](crate::Connection) is built from, and the [`Credentials`] and
//! [`ServiceSelection`] values derived from it.

use crate::client::{ClientConfig, ProxyConfig, RetryPolicy};
use crate::endpoint::Endpoint;
use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use validator::{Validate, ValidationError, ValidationErrors};

/// Default service type looked up in the service catalog
pub const DEFAULT_SERVICE_TYPE: &str = "compute";

/// Default service name looked up in the service catalog
pub const DEFAULT_SERVICE_NAME: &str = "nova";

const REQUIRED_FIELDS: [&str; 3] = ["username", "api_key", "auth_url"];

/// Configuration for a compute connection.
#[derive(Debug, Deserialize, Validate)]
pub struct ConnectionConfig {
    /// Account user name
    #[validate(length(min = 1))]
    pub username: String,

    /// API key or password
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: SecretString,

    /// Identity service URL, e.g. `https://identity.example.com/v2.0`
    #[validate(length(min = 1))]
    pub auth_url: String,

    /// Tenant sent with password credentials (defaults to the username)
    #[serde(default)]
    pub tenant: Option<String>,

    /// Service name to select from the catalog
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Service type to select from the catalog
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Region to select from the catalog (first endpoint when unset)
    #[serde(default)]
    pub region: Option<String>,

    /// Whether to re-authenticate and replay a request when the token expires
    #[serde(default = "default_retry_auth")]
    pub retry_auth: bool,

    /// Optional HTTP proxy host
    #[serde(default)]
    pub proxy_host: Option<String>,

    /// Optional HTTP proxy port
    #[serde(default)]
    pub proxy_port: Option<u16>,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of replays after transient transport faults
    #[validate(range(max = 10))]
    #[serde(default = "default_max_transport_retries")]
    pub max_transport_retries: u32,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}

const fn default_retry_auth() -> bool {
    true
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_request_timeout_secs() -> u64 {
    crate::client::DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_transport_retries() -> u32 {
    crate::client::MAX_TRANSPORT_RETRIES
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl ConnectionConfig {
    /// Create a new connection configuration with the required parameters.
    ///
    /// # Arguments
    ///
    /// * `username` - Account user name
    /// * `api_key` - API key (or password for password-credential identity services)
    /// * `auth_url` - Identity URL; a path ending in `v2.0` selects the catalog protocol
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] if a required value is empty, or
    /// [`Error::InvalidArgument`] if the identity URL does not parse to a host.
    pub fn new(
        username: impl Into<String>,
        api_key: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            username: username.into(),
            api_key: SecretString::from(api_key.into()),
            auth_url: auth_url.into(),
            tenant: None,
            service_name: default_service_name(),
            service_type: default_service_type(),
            region: None,
            retry_auth: default_retry_auth(),
            proxy_host: None,
            proxy_port: None,
            tls_verify: default_tls_verify(),
            request_timeout_secs: default_request_timeout_secs(),
            max_transport_retries: default_max_transport_retries(),
        };

        config.check()?;
        Ok(config)
    }

    /// Set the tenant sent with password credentials.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set the service name to select from the catalog.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the service type to select from the catalog.
    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    /// Set the region to select from the catalog.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set whether an expired token triggers re-authentication.
    #[must_use]
    pub const fn with_retry_auth(mut self, retry: bool) -> Self {
        self.retry_auth = retry;
        self
    }

    /// Route requests through an HTTP proxy.
    #[must_use]
    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy_host = Some(host.into());
        self.proxy_port = Some(port);
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum transport retries.
    #[must_use]
    pub const fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the configuration and parse the identity URL.
    ///
    /// Deserialized configurations go through the same checks as [`ConnectionConfig::new`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for empty required values and
    /// [`Error::InvalidArgument`] for malformed ones.
    pub fn check(&self) -> Result<Endpoint, Error> {
        let mut validated = self.validate();
        // SecretString has no Serialize impl, so validator cannot see the key
        if self.api_key.expose_secret().is_empty() {
            let mut errors = validated.err().unwrap_or_else(ValidationErrors::new);
            errors.add("api_key", ValidationError::new("length"));
            validated = Err(errors);
        }
        validated.map_err(validation_error)?;
        if self.proxy_host.is_some() && self.proxy_port.is_none() {
            return Err(Error::InvalidArgument(
                "proxy_port must be supplied with proxy_host".to_string(),
            ));
        }
        self.identity_endpoint()
    }

    /// Parse the identity URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the URL cannot be parsed or has no host.
    pub fn identity_endpoint(&self) -> Result<Endpoint, Error> {
        Endpoint::parse(&self.auth_url).map_err(|err| match err {
            Error::InvalidArgument(reason) => {
                Error::InvalidArgument(format!("Invalid auth_url parameter: {reason}"))
            }
            other => other,
        })
    }

    /// Credentials presented to the identity service.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            api_key: SecretString::from(self.api_key.expose_secret().to_owned()),
            tenant: self.tenant.clone(),
        }
    }

    /// Catalog selection criteria.
    #[must_use]
    pub fn service_selection(&self) -> ServiceSelection {
        ServiceSelection {
            service_type: self.service_type.clone(),
            service_name: self.service_name.clone(),
            region: self.region.clone(),
        }
    }

    /// HTTP client settings for the transport pool.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new()
            .with_timeout(self.timeout())
            .with_tls_verification(self.tls_verify)
            .with_retry_policy(
                RetryPolicy::new().with_max_transport_retries(self.max_transport_retries),
            );

        if let (Some(host), Some(port)) = (&self.proxy_host, self.proxy_port) {
            config = config.with_proxy(ProxyConfig::new(host.clone(), port));
        }

        config
    }
}

impl Clone for ConnectionConfig {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            api_key: SecretString::from(self.api_key.expose_secret().to_owned()),
            auth_url: self.auth_url.clone(),
            tenant: self.tenant.clone(),
            service_name: self.service_name.clone(),
            service_type: self.service_type.clone(),
            region: self.region.clone(),
            retry_auth: self.retry_auth,
            proxy_host: self.proxy_host.clone(),
            proxy_port: self.proxy_port,
            tls_verify: self.tls_verify,
            request_timeout_secs: self.request_timeout_secs,
            max_transport_retries: self.max_transport_retries,
        }
    }
}

fn validation_error(errors: ValidationErrors) -> Error {
    let fields = errors.field_errors();
    for required in REQUIRED_FIELDS {
        if fields.keys().any(|field| *field == required) {
            return Error::MissingArgument(format!("Must supply a {required}"));
        }
    }
    errors.into()
}

/// Credentials presented to the identity service.
pub struct Credentials {
    username: String,
    api_key: SecretString,
    tenant: Option<String>,
}

impl Credentials {
    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// Returns the tenant, falling back to the user name.
    #[must_use]
    pub fn tenant(&self) -> &str {
        self.tenant.as_deref().unwrap_or(&self.username)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"[REDACTED]")
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Which catalog entry and endpoint a session should use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceSelection {
    /// Catalog `type`, e.g. `compute`
    pub service_type: String,
    /// Catalog `name`, e.g. `nova`
    pub service_name: String,
    /// Region, compared case-insensitively
    pub region: Option<String>,
}

impl Default for ServiceSelection {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            service_name: default_service_name(),
            region: None,
        }
    }
}
