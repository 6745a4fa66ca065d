//! Identity service authentication.
//!
//! Two incompatible protocols are supported:
//!
//! - the legacy header protocol, a `GET` carrying `X-Auth-User` and
//!   `X-Auth-Key` that answers with the token and management URL in headers
//! - the catalog protocol (identity `v2.0`), a JSON `POST` to `/tokens` that
//!   answers with a token and a service catalog the management endpoint is
//!   picked from
//!
//! Which one a connection speaks is fixed by the identity URL when the
//! connection is built.

use crate::config::{Credentials, ServiceSelection};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::{RawRequest, RawResponse, Transport, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::{debug, info, warn};

/// Header carrying the user name in the legacy protocol
pub const AUTH_USER_HEADER: &str = "x-auth-user";
/// Header carrying the API key in the legacy protocol
pub const AUTH_KEY_HEADER: &str = "x-auth-key";
/// Header carrying the bearer token
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";
/// Header carrying the management URL in the legacy protocol
pub const MANAGEMENT_URL_HEADER: &str = "x-server-management-url";

/// Login protocol spoken with the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    /// Header-based protocol (`v1.0` style identity URLs)
    Legacy,
    /// Token and service catalog protocol (`v2.0` identity URLs)
    Catalog,
}

impl AuthProtocol {
    /// Picks the protocol for an identity endpoint: paths ending in `v2.0`
    /// speak the catalog protocol, everything else the legacy one.
    #[must_use]
    pub fn detect(identity: &Endpoint) -> Self {
        if identity.path().trim_end_matches('/').ends_with("v2.0") {
            Self::Catalog
        } else {
            Self::Legacy
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Catalog => "catalog",
        }
    }
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One service in the catalog returned by the identity service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Service type, e.g. `compute`
    #[serde(rename = "type")]
    pub service_type: String,
    /// Service name, e.g. `nova`
    #[serde(default)]
    pub name: Option<String>,
    /// Region-tagged endpoints
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// One endpoint of a catalog entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogEndpoint {
    /// Region tag
    #[serde(default)]
    pub region: Option<String>,
    /// Public URL of the service in this region
    #[serde(rename = "publicURL", default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

/// Outcome of looking up the management endpoint in a service catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSelection {
    /// A usable endpoint was found
    Selected(Endpoint),
    /// No entry has the configured service type and name
    NoMatchingService,
    /// An entry matched but has no usable endpoint for the region
    NoEndpointForRegion,
}

/// Picks the management endpoint from a service catalog.
///
/// The first entry whose type and name both match is used. With a region
/// configured, the last endpoint whose region matches it case-insensitively
/// wins; without one, the first endpoint is taken.
#[must_use]
pub fn select_endpoint(catalog: &[CatalogEntry], selection: &ServiceSelection) -> CatalogSelection {
    let Some(entry) = catalog.iter().find(|entry| {
        entry.service_type == selection.service_type
            && entry.name.as_deref() == Some(selection.service_name.as_str())
    }) else {
        return CatalogSelection::NoMatchingService;
    };

    let candidate = match selection.region.as_deref() {
        Some(region) => entry
            .endpoints
            .iter()
            .rev()
            .find(|endpoint| {
                endpoint
                    .region
                    .as_deref()
                    .is_some_and(|tag| tag.eq_ignore_ascii_case(region))
            }),
        None => entry.endpoints.first(),
    };

    candidate
        .and_then(|endpoint| endpoint.public_url.as_deref())
        .and_then(|url| Endpoint::parse(url).ok())
        .map_or(CatalogSelection::NoEndpointForRegion, CatalogSelection::Selected)
}

/// Runs the login exchange and fills a [`Session`].
#[derive(Debug)]
pub struct Authenticator {
    protocol: AuthProtocol,
    identity: Endpoint,
    credentials: Credentials,
}

impl Authenticator {
    /// Creates an authenticator, detecting the protocol from `identity`.
    #[must_use]
    pub fn new(identity: Endpoint, credentials: Credentials) -> Self {
        Self {
            protocol: AuthProtocol::detect(&identity),
            identity,
            credentials,
        }
    }

    /// Returns the protocol in use.
    #[must_use]
    pub const fn protocol(&self) -> AuthProtocol {
        self.protocol
    }

    /// Returns the identity endpoint.
    #[must_use]
    pub const fn identity(&self) -> &Endpoint {
        &self.identity
    }

    /// Logs in and stores the token and management endpoint in `session`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the identity host cannot be reached and
    /// [`Error::Authentication`] if the credentials are rejected or no usable
    /// endpoint is found.
    pub async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        session: &mut Session,
    ) -> Result<()> {
        info!(
            protocol = self.protocol.name(),
            host = self.identity.host(),
            user = self.credentials.username(),
            "authenticating"
        );

        match self.protocol {
            AuthProtocol::Legacy => self.legacy(transport, session).await,
            AuthProtocol::Catalog => self.catalog(transport, session).await,
        }
    }

    async fn legacy(&self, transport: &mut dyn Transport, session: &mut Session) -> Result<()> {
        let path = if self.identity.path().is_empty() {
            "/"
        } else {
            self.identity.path()
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(AUTH_USER_HEADER),
            header_value(self.credentials.username(), "username")?,
        );
        let mut key = header_value(self.credentials.api_key().expose_secret(), "api_key")?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(AUTH_KEY_HEADER), key);

        let request = RawRequest::new(Method::GET, path).with_headers(headers);
        let response = self.send(transport, &request).await?;

        if !response.is_success() {
            session.invalidate();
            return Err(rejected(&response));
        }

        let token = response.header(AUTH_TOKEN_HEADER).ok_or_else(|| {
            missing_in_response(&response, "Identity service returned no X-Auth-Token header")
        })?;
        let management_url = response.header(MANAGEMENT_URL_HEADER).ok_or_else(|| {
            missing_in_response(
                &response,
                "Identity service returned no X-Server-Management-Url header",
            )
        })?;
        let management = Endpoint::parse(management_url).map_err(|err| {
            missing_in_response(&response, &format!("Invalid management URL: {err}"))
        })?;

        debug!(endpoint = %management, "legacy authentication succeeded");
        session.establish(SecretString::from(token.to_owned()), management);
        Ok(())
    }

    async fn catalog(&self, transport: &mut dyn Transport, session: &mut Session) -> Result<()> {
        let path = format!("{}/tokens", self.identity.path());
        let username = self.credentials.username();
        let key = self.credentials.api_key().expose_secret();

        let api_key_body = json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": username,
                    "apiKey": key,
                }
            }
        });
        let mut response = self
            .send(transport, &catalog_request(&path, &api_key_body))
            .await?;

        if response.status.is_client_error() {
            debug!(
                status = response.status.as_u16(),
                "API key credentials rejected, retrying with password credentials"
            );
            let password_body = json!({
                "auth": {
                    "passwordCredentials": {
                        "username": username,
                        "password": key,
                    },
                    "tenantName": self.credentials.tenant(),
                }
            });
            response = self
                .send(transport, &catalog_request(&path, &password_body))
                .await?;
        }

        if !response.is_success() {
            session.invalidate();
            return Err(rejected(&response));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body).map_err(|err| {
            missing_in_response(&response, &format!("Malformed identity response: {err}"))
        })?;
        let token = SecretString::from(parsed.access.token.id);

        match select_endpoint(&parsed.access.service_catalog, session.service()) {
            CatalogSelection::Selected(management) => {
                debug!(endpoint = %management, "catalog authentication succeeded");
                session.establish(token, management);
                Ok(())
            }
            CatalogSelection::NoMatchingService => {
                warn!(
                    service_type = %session.service().service_type,
                    service_name = %session.service().service_name,
                    "service catalog has no matching service"
                );
                session.mark_unmatched(token);
                Ok(())
            }
            CatalogSelection::NoEndpointForRegion => {
                session.invalidate();
                Err(Error::authentication(format!(
                    "No API endpoint for region {}",
                    session.region().unwrap_or("(default)")
                )))
            }
        }
    }

    async fn send(&self, transport: &mut dyn Transport, request: &RawRequest) -> Result<RawResponse> {
        let err = match transport.send(&self.identity, request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        warn!(host = self.identity.host(), error = %err, "identity request failed");
        match err {
            TransportError::Transient(reason) => {
                transport.discard(&self.identity);
                Err(Error::Connection(format!(
                    "Unable to connect to {}: {reason}",
                    self.identity.host()
                )))
            }
            other => Err(other.into()),
        }
    }
}

fn catalog_request(path: &str, body: &serde_json::Value) -> RawRequest {
    RawRequest::new(Method::POST, path)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_header(ACCEPT, HeaderValue::from_static("application/json"))
        .with_body(body.to_string())
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidArgument(format!("{field} contains characters not allowed in a header")))
}

fn rejected(response: &RawResponse) -> Error {
    Error::Authentication {
        message: format!(
            "Authentication failed with response code {}",
            response.status.as_u16()
        ),
        status: Some(response.status.as_u16()),
        body: Some(response.body.clone()),
    }
}

fn missing_in_response(response: &RawResponse, message: &str) -> Error {
    Error::Authentication {
        message: message.to_string(),
        status: Some(response.status.as_u16()),
        body: Some(response.body.clone()),
    }
}
