//! HTTP client settings and retry limits.
//!
//! This module provides the knobs the transport pool and the request pipeline
//! read: timeouts, proxy and TLS settings, and how many times a request is
//! replayed after a transient fault or an expired token.

use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("compute-core/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout for pooled connections in seconds
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Idle sockets kept per host; each host is served by a single connection.
pub const POOL_MAX_IDLE_PER_HOST: usize = 1;

/// Number of reconnect-and-replay attempts after a transient transport fault
pub const MAX_TRANSPORT_RETRIES: u32 = 5;

/// Number of re-authentications allowed per request after an expired token
pub const MAX_AUTH_RETRIES: u32 = 1;

/// How often a request is replayed.
///
/// Transport retries are immediate: a transient fault discards the pooled
/// handle and the same request is sent again on a fresh one, with no delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of replays after transient transport faults
    pub max_transport_retries: u32,

    /// Maximum number of re-authentications after an expired token
    pub max_auth_retries: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_transport_retries: MAX_TRANSPORT_RETRIES,
            max_auth_retries: MAX_AUTH_RETRIES,
        }
    }

    /// Create a retry policy with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_transport_retries: 0,
            max_auth_retries: 0,
        }
    }

    /// Set the maximum number of transport retries.
    #[must_use]
    pub const fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    /// Set the maximum number of re-authentications per request.
    #[must_use]
    pub const fn with_max_auth_retries(mut self, retries: u32) -> Self {
        self.max_auth_retries = retries;
        self
    }

    /// Check if transport retries are enabled.
    #[must_use]
    pub const fn has_retries(&self) -> bool {
        self.max_transport_retries > 0
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP proxy used for every host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy host name
    pub host: String,
    /// Proxy port
    pub port: u16,
}

impl ProxyConfig {
    /// Create a proxy configuration.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the proxy URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// HTTP client configuration.
///
/// Configures the handles built by the transport pool and the retry limits of
/// the request pipeline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Whether peer certificates are verified on `https` hosts
    pub tls_verify: bool,

    /// Optional HTTP proxy
    pub proxy: Option<ProxyConfig>,

    /// Retry policy
    pub retry_policy: RetryPolicy,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            tls_verify: true,
            proxy: None,
            retry_policy: RetryPolicy::new(),
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Route every request through an HTTP proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Disable retries.
    #[must_use]
    pub const fn without_retries(mut self) -> Self {
        self.retry_policy = RetryPolicy::no_retry();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
