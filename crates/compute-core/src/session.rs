//! Per-connection authentication state.

use crate::config::ServiceSelection;
use crate::endpoint::Endpoint;
use secrecy::SecretString;

/// Mutable authentication state owned by a single [`Connection`](crate::Connection).
///
/// A session starts empty. A successful authentication stores a token and the
/// management endpoint and marks it authenticated; an expired token clears it
/// until the next authentication fills it again.
#[derive(Debug)]
pub struct Session {
    token: Option<SecretString>,
    authenticated: bool,
    management: Option<Endpoint>,
    service: ServiceSelection,
}

impl Session {
    /// Creates an empty session that will select `service` from the catalog.
    #[must_use]
    pub const fn new(service: ServiceSelection) -> Self {
        Self {
            token: None,
            authenticated: false,
            management: None,
            service,
        }
    }

    /// Returns the bearer token, if one has been issued.
    #[must_use]
    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Returns true once a token and a management endpoint are both in place.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the endpoint resource operations are issued against.
    #[must_use]
    pub fn management_endpoint(&self) -> Option<&Endpoint> {
        self.management.as_ref()
    }

    /// Returns the catalog selection criteria.
    #[must_use]
    pub const fn service(&self) -> &ServiceSelection {
        &self.service
    }

    /// Returns the configured region, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.service.region.as_deref()
    }

    pub(crate) fn establish(&mut self, token: SecretString, management: Endpoint) {
        self.token = Some(token);
        self.management = Some(management);
        self.authenticated = true;
    }

    /// Token issued, but the catalog offered no matching service.
    pub(crate) fn mark_unmatched(&mut self, token: SecretString) {
        self.token = Some(token);
        self.management = None;
        self.authenticated = false;
    }

    pub(crate) fn invalidate(&mut self) {
        self.token = None;
        self.authenticated = false;
    }
}
