//! Pooled HTTP transport.
//!
//! [`TransportPool`] keeps one `reqwest` client per distinct (scheme, host,
//! port), built on first use and reused for every later request to that host.
//! The [`Transport`] trait is the seam the request pipeline and the
//! authenticator talk to, so tests can substitute a mock.

use crate::client::{ClientConfig, POOL_MAX_IDLE_PER_HOST, USER_AGENT};
use crate::endpoint::{Endpoint, HostKey, Scheme};
use crate::error::Error;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// A request as handed to the transport.
///
/// `path` is absolute on the target host and already includes the endpoint
/// prefix and any query string.
#[derive(Debug, Clone)]
pub struct RawRequest {
    /// HTTP method
    pub method: Method,
    /// Path and query
    pub path: String,
    /// Headers sent verbatim
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<String>,
}

impl RawRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Replaces the header map.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets one header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body decoded as text
    pub body: String,
}

impl RawResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a header value when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserializes the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body)
            .map_err(|err| Error::Parse(format!("Failed to parse response body: {err}")))
    }
}

/// Failure raised by a [`Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connection could be established with the host
    #[error("Unable to connect to {host}: {reason}")]
    Connect {
        /// Host that refused the connection
        host: String,
        /// Underlying reason
        reason: String,
    },

    /// The exchange broke mid-flight (timeout, reset, truncated body)
    #[error("Transient transport fault: {0}")]
    Transient(String),

    /// The HTTP client could not be built
    #[error("{0}")]
    Config(String),

    /// The request could not be turned into a valid HTTP request
    #[error("{0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Returns true for faults the pipeline may retry on a fresh handle.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    fn from_reqwest(host: &str, err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Config(format!("Failed to build request: {err}"))
        } else if err.is_connect() {
            Self::Connect {
                host: host.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::Transient(err.to_string())
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { .. } | TransportError::Transient(_) => {
                Self::Connection(err.to_string())
            }
            TransportError::Config(message) => Self::Config(message),
            TransportError::InvalidRequest(message) => Self::InvalidArgument(message),
        }
    }
}

/// Sends requests to a host and forgets broken connections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to the host named by `target` and reads the whole response.
    async fn send(
        &mut self,
        target: &Endpoint,
        request: &RawRequest,
    ) -> Result<RawResponse, TransportError>;

    /// Drops the handle for `target`'s host so the next send opens a fresh one.
    fn discard(&mut self, target: &Endpoint);
}

/// One persistent HTTP client per host, created lazily.
#[derive(Debug)]
pub struct TransportPool {
    config: ClientConfig,
    handles: HashMap<HostKey, Client>,
}

impl TransportPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            handles: HashMap::new(),
        }
    }

    /// Returns the settings handles are built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handle has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns true if a handle exists for `target`'s host.
    #[must_use]
    pub fn contains(&self, target: &Endpoint) -> bool {
        self.handles.contains_key(&target.host_key())
    }

    fn handle(&mut self, target: &Endpoint) -> Result<Client, TransportError> {
        let key = target.host_key();
        if let Some(client) = self.handles.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_handle(&key)?;
        debug!(host = %key, "opened transport handle");
        self.handles.insert(key, client.clone());
        Ok(client)
    }

    fn build_handle(&self, key: &HostKey) -> Result<Client, TransportError> {
        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST);

        if let Some(proxy) = &self.config.proxy {
            let proxy = Proxy::all(proxy.url()).map_err(|err| {
                TransportError::Config(format!("Invalid proxy {}: {err}", proxy.url()))
            })?;
            builder = builder.proxy(proxy);
        }

        if key.scheme == Scheme::Https && !self.config.tls_verify {
            warn!(host = %key, "TLS verification disabled for compute transport");
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(|err| {
            TransportError::Config(format!("Failed to build HTTP client for {key}: {err}"))
        })
    }
}

#[async_trait]
impl Transport for TransportPool {
    async fn send(
        &mut self,
        target: &Endpoint,
        request: &RawRequest,
    ) -> Result<RawResponse, TransportError> {
        let client = self.handle(target)?;
        let url = target
            .url_for(&request.path)
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;

        debug!(method = %request.method, %url, "sending request");

        let mut builder = client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::from_reqwest(target.host(), &err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Transient(format!("Failed to read response body: {err}")))?;

        debug!(status = status.as_u16(), host = target.host(), "received response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn discard(&mut self, target: &Endpoint) {
        if self.handles.remove(&target.host_key()).is_some() {
            debug!(host = %target.host_key(), "discarded transport handle");
        }
    }
}
