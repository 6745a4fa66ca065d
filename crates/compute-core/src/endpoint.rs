//! Parsed endpoint descriptors.
//!
//! An [`Endpoint`] is the immutable (scheme, host, port, path) view of a URL that
//! every other component works with: the identity service, the management
//! endpoint returned by authentication, and the keys of the transport pool.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, Result};

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;
/// Default HTTPS port
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// URL scheme supported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
}

impl Scheme {
    /// Returns the scheme as it appears in a URL.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Returns the well-known port for the scheme.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Http => DEFAULT_HTTP_PORT,
            Self::Https => DEFAULT_HTTPS_PORT,
        }
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(Error::InvalidArgument(format!("Unsupported URL scheme: {s}"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a pooled connection: one handle exists per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey {
    /// Scheme used to reach the host
    pub scheme: Scheme,
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Immutable parsed representation of a service URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    ///
    /// A trailing `/` on `path` is dropped so that relative paths can be appended
    /// directly.
    #[must_use]
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16, path: impl AsRef<str>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            path: normalize_path(path.as_ref()),
        }
    }

    /// Parses an absolute `http` or `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the input is not an absolute URL,
    /// has no host, or uses another scheme.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|err| Error::InvalidArgument(format!("Invalid URL `{input}`: {err}")))?;
        Self::from_url(&url)
    }

    /// Builds an endpoint from an already parsed [`Url`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the URL has no host or an unsupported scheme.
    pub fn from_url(url: &Url) -> Result<Self> {
        let scheme: Scheme = url.scheme().parse()?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::InvalidArgument(format!("URL `{url}` has no host")))?;
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self::new(scheme, host, port, url.path()))
    }

    /// Returns the scheme.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the path prefix, without a trailing slash (empty for the root).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the key under which the transport pool stores this host's handle.
    #[must_use]
    pub fn host_key(&self) -> HostKey {
        HostKey {
            scheme: self.scheme,
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Returns `scheme://host:port`.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Appends `relative` to this endpoint's path prefix.
    #[must_use]
    pub fn join_path(&self, relative: &str) -> String {
        if relative.is_empty() {
            return self.path.clone();
        }
        if relative.starts_with('/') || relative.starts_with('?') {
            format!("{}{relative}", self.path)
        } else {
            format!("{}/{relative}", self.path)
        }
    }

    /// Returns a copy of the endpoint pointing at another path.
    #[must_use]
    pub fn with_path(&self, path: impl AsRef<str>) -> Self {
        Self::new(self.scheme, self.host.clone(), self.port, path)
    }

    /// Builds the absolute URL for a request path on this endpoint's host.
    ///
    /// `path` is absolute on the host (it already includes any prefix) and may
    /// carry a query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the combined URL does not parse.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let separator = if path.starts_with('/') { "" } else { "/" };
        let raw = format!("{}{separator}{path}", self.origin());
        Url::parse(&raw).map_err(|err| Error::InvalidArgument(format!("Invalid request URL `{raw}`: {err}")))
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.path)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
