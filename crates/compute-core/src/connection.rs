//! The request pipeline.
//!
//! [`Connection`] owns the session, the authenticator and the transport, and
//! every API call goes through [`Connection::raw_request`]:
//!
//! 1. default headers are attached (`Accept`, `Connection`, `User-Agent`, and
//!    `X-Auth-Token` once authenticated), caller headers override them
//! 2. the request is sent; transient transport faults discard the host's
//!    handle and replay the request immediately, up to the retry limit
//! 3. a 401 clears the token, re-authenticates and replays the request, once
//! 4. a 413 is raised as an over-limit fault and never replayed
//!
//! [`Connection::request`] adds the management endpoint prefix on top and
//! turns every non-2xx answer into a typed error.

use crate::auth::{AuthProtocol, Authenticator, AUTH_TOKEN_HEADER};
use crate::client::{RetryPolicy, USER_AGENT};
use crate::config::ConnectionConfig;
use crate::endpoint::Endpoint;
use crate::error::{classify, ApiError, Error, Result};
use crate::session::Session;
use crate::transport::{RawRequest, RawResponse, Transport, TransportError, TransportPool};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Per-call additions to a [`Connection::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    body: Option<String>,
    target: Option<Endpoint>,
}

impl RequestOptions {
    /// No extra headers, no body, management endpoint as target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header that overrides the defaults.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets a raw body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `value` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_string(value)?;
        Ok(self.with_body(body))
    }

    /// Sends the request to another endpoint; its path becomes the prefix.
    #[must_use]
    pub fn with_target(mut self, target: Endpoint) -> Self {
        self.target = Some(target);
        self
    }
}

/// What came back from one trip through the transport.
enum Dispatch {
    Response(RawResponse),
    /// The server answered 401: the token has to be renewed.
    Expired(RawResponse),
}

/// An authenticated session with a compute service.
///
/// Methods take `&mut self`, so one connection serves one request at a time.
/// Build several connections for parallel work.
pub struct Connection {
    authenticator: Authenticator,
    session: Session,
    transport: Box<dyn Transport>,
    retry_auth: bool,
    retry_policy: RetryPolicy,
}

impl Connection {
    /// Builds a connection without contacting the identity service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] or [`Error::InvalidArgument`] if the
    /// configuration does not validate.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let pool = TransportPool::new(config.client_config());
        Self::with_transport(config, pool)
    }

    /// Builds a connection that sends through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] or [`Error::InvalidArgument`] if the
    /// configuration does not validate.
    pub fn with_transport(
        config: ConnectionConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        let identity = config.check()?;
        let authenticator = Authenticator::new(identity, config.credentials());
        debug!(
            protocol = authenticator.protocol().name(),
            identity = %authenticator.identity(),
            "connection configured"
        );

        Ok(Self {
            authenticator,
            session: Session::new(config.service_selection()),
            transport: Box::new(transport),
            retry_auth: config.retry_auth,
            retry_policy: config.client_config().retry_policy,
        })
    }

    /// Builds a connection and authenticates it.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, or the failure reported by
    /// [`Connection::authenticate`].
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let mut connection = Self::new(config)?;
        connection.authenticate().await?;
        Ok(connection)
    }

    /// Runs the login exchange, replacing any previous token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the identity host cannot be reached and
    /// [`Error::Authentication`] if the credentials are rejected.
    pub async fn authenticate(&mut self) -> Result<()> {
        self.authenticator
            .authenticate(self.transport.as_mut(), &mut self.session)
            .await
    }

    /// Returns true once a token and a management endpoint are in place.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Returns the authentication state.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the endpoint resource operations are issued against.
    #[must_use]
    pub fn management_endpoint(&self) -> Option<&Endpoint> {
        self.session.management_endpoint()
    }

    /// Returns the identity protocol in use.
    #[must_use]
    pub const fn auth_protocol(&self) -> AuthProtocol {
        self.authenticator.protocol()
    }

    /// Sends a request relative to the management endpoint.
    ///
    /// Authenticates first if no token has been issued yet. When a body is
    /// present and no `Content-Type` was given, `application/json` is sent.
    ///
    /// # Errors
    ///
    /// Every non-2xx answer becomes a typed error: [`Error::Api`] for compute
    /// faults, [`Error::Authentication`] or [`Error::Connection`] when the
    /// pipeline gives up.
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<RawResponse> {
        if self.session.token().is_none() {
            self.authenticate().await?;
        }

        let RequestOptions {
            mut headers,
            body,
            target,
        } = options;

        let target = match target {
            Some(target) => target,
            None => self
                .session
                .management_endpoint()
                .cloned()
                .ok_or_else(no_management_endpoint)?,
        };
        let full_path = target.join_path(path);

        if body.is_some() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let response = self
            .raw_request(method, &target, &full_path, headers, body)
            .await?;

        match classify(response.status, &response.body) {
            Some(fault) => {
                debug!(status = fault.status, kind = %fault.kind, "compute fault");
                Err(fault.into())
            }
            None => Ok(response),
        }
    }

    /// Sends a request to any host, with the pipeline's retry handling but
    /// without fault classification.
    ///
    /// `path` is absolute on `target`'s host. Only 413 is turned into an error;
    /// every other status is returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] when the host is unreachable or transport
    /// retries are exhausted, [`Error::Authentication`] when the token cannot
    /// be renewed, and an over-limit [`Error::Api`] for 413.
    pub async fn raw_request(
        &mut self,
        method: Method,
        target: &Endpoint,
        path: &str,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<RawResponse> {
        let mut auth_attempts = 0;

        loop {
            let request = RawRequest {
                method: method.clone(),
                path: path.to_string(),
                headers: self.prepare_headers(&headers)?,
                body: body.clone(),
            };

            match self.dispatch(target, &request).await? {
                Dispatch::Response(response) if response.status == StatusCode::PAYLOAD_TOO_LARGE => {
                    warn!(host = target.host(), path, "rate limit exceeded");
                    return Err(ApiError::rate_limited(response.status, &response.body).into());
                }
                Dispatch::Response(response) => return Ok(response),
                Dispatch::Expired(response) => {
                    if !self.retry_auth {
                        debug!(
                            status = response.status.as_u16(),
                            body = %response.body,
                            "token expired, re-authentication disabled"
                        );
                        return Err(Error::Connection(
                            "Authentication token expired and you have requested not to retry"
                                .to_string(),
                        ));
                    }
                    if auth_attempts >= self.retry_policy.max_auth_retries {
                        return Err(Error::Authentication {
                            message: "Token rejected again after re-authenticating".to_string(),
                            status: Some(response.status.as_u16()),
                            body: Some(response.body),
                        });
                    }

                    auth_attempts += 1;
                    info!(
                        host = target.host(),
                        attempt = auth_attempts,
                        "authentication token expired, re-authenticating"
                    );
                    self.session.invalidate();
                    self.authenticate().await?;
                    if !self.session.is_authenticated() {
                        return Err(no_management_endpoint());
                    }
                }
            }
        }
    }

    fn prepare_headers(&self, overrides: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("Keep-Alive"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        if self.session.is_authenticated() {
            if let Some(token) = self.session.token() {
                let mut value = HeaderValue::from_str(token.expose_secret()).map_err(|_| {
                    Error::authentication("Token contains characters not allowed in a header")
                })?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), value);
            }
        }

        headers.extend(overrides.clone());
        Ok(headers)
    }

    async fn dispatch(&mut self, target: &Endpoint, request: &RawRequest) -> Result<Dispatch> {
        let mut attempt = 0;

        loop {
            match self.transport.send(target, request).await {
                Ok(response) if response.status == StatusCode::UNAUTHORIZED => {
                    debug!(host = target.host(), path = %request.path, "token rejected");
                    return Ok(Dispatch::Expired(response));
                }
                Ok(response) => return Ok(Dispatch::Response(response)),
                Err(TransportError::Transient(reason)) => {
                    if attempt >= self.retry_policy.max_transport_retries {
                        warn!(host = target.host(), attempt, "giving up after transient faults");
                        return Err(Error::Connection(format!(
                            "Unable to reconnect to {} after {attempt} attempts",
                            target.host()
                        )));
                    }
                    attempt += 1;
                    warn!(
                        host = target.host(),
                        attempt,
                        error = %reason,
                        "transient transport fault, reconnecting"
                    );
                    self.transport.discard(target);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn no_management_endpoint() -> Error {
    Error::authentication(
        "Session has no management endpoint: the service catalog did not list the configured service",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::transport::MockTransport;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(auth_url: &str) -> ConnectionConfig {
        ConnectionConfig::new("demo", "secret-key", auth_url).unwrap()
    }

    fn management() -> Endpoint {
        Endpoint::parse("https://cloud.example.com:8774/v1.1/1234").unwrap()
    }

    async fn mount_legacy_auth(server: &MockServer, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/v1.0"))
            .and(header("X-Auth-User", "demo"))
            .respond_with(
                ResponseTemplate::new(204)
                    .insert_header("X-Auth-Token", "fresh-token")
                    .insert_header(
                        "X-Server-Management-Url",
                        format!("{}/v1.1/1234", server.uri()).as_str(),
                    ),
            )
            .expect(expected)
            .mount(server)
            .await;
    }

    async fn connect(server: &MockServer) -> Connection {
        Connection::connect(config(&format!("{}/v1.0", server.uri())))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transient_faults_exhaust_after_five_retries() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(6)
            .returning(|_, _| Err(TransportError::Transient("connection reset".to_string())));
        transport.expect_discard().times(5).return_const(());

        let mut connection =
            Connection::with_transport(config("https://identity.example.com/v1.0"), transport)
                .unwrap();
        let err = connection
            .raw_request(
                Method::GET,
                &management(),
                "/v1.1/1234/servers",
                HeaderMap::new(),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::Connection(
                "Unable to reconnect to cloud.example.com after 5 attempts".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_transient_fault_then_success() {
        let mut transport = MockTransport::new();
        let mut calls = 0;
        transport.expect_send().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(TransportError::Transient("broken pipe".to_string()))
            } else {
                Ok(RawResponse::new(StatusCode::OK, "{}"))
            }
        });
        transport.expect_discard().times(1).return_const(());

        let mut connection =
            Connection::with_transport(config("https://identity.example.com/v1.0"), transport)
                .unwrap();
        let response = connection
            .raw_request(Method::GET, &management(), "/v1.1/1234", HeaderMap::new(), None)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_connect_errors_are_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_, _| {
            Err(TransportError::Connect {
                host: "cloud.example.com".to_string(),
                reason: "connection refused".to_string(),
            })
        });
        transport.expect_discard().never();

        let mut connection =
            Connection::with_transport(config("https://identity.example.com/v1.0"), transport)
                .unwrap();
        let err = connection
            .raw_request(Method::GET, &management(), "/", HeaderMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(message) if message.starts_with("Unable to connect to cloud.example.com")));
    }

    #[test]
    fn test_default_headers_without_token() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|_, request| {
                request.headers.get("accept").map(HeaderValue::as_bytes) == Some(b"application/json")
                    && request.headers.get("connection").map(HeaderValue::as_bytes)
                        == Some(b"Keep-Alive")
                    && request.headers.contains_key("user-agent")
                    && !request.headers.contains_key(AUTH_TOKEN_HEADER)
            })
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::OK, "")));

        let mut connection =
            Connection::with_transport(config("https://identity.example.com/v1.0"), transport)
                .unwrap();
        let response = tokio_test::block_on(connection.raw_request(
            Method::GET,
            &management(),
            "/v1.1/1234",
            HeaderMap::new(),
            None,
        ))
        .unwrap();
        assert!(response.is_success());
    }

    #[test]
    fn test_caller_headers_override_defaults() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|_, request| {
                request.headers.get("accept").map(HeaderValue::as_bytes) == Some(b"text/plain")
            })
            .times(1)
            .returning(|_, _| Ok(RawResponse::new(StatusCode::OK, "")));

        let mut connection =
            Connection::with_transport(config("https://identity.example.com/v1.0"), transport)
                .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));

        tokio_test::block_on(connection.raw_request(
            Method::GET,
            &management(),
            "/v1.1/1234",
            headers,
            None,
        ))
        .unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_reauthenticates_once() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers"))
            .and(header("X-Auth-Token", "fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"servers\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = connect(&server).await;
        let response = connection
            .request(Method::GET, "/servers", RequestOptions::new())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "{\"servers\":[]}");
        assert!(connection.is_authenticated());
    }

    #[tokio::test]
    async fn test_second_expiry_is_an_authentication_failure() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 2).await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(2)
            .mount(&server)
            .await;

        let mut connection = connect(&server).await;
        let err = connection
            .request(Method::GET, "/servers", RequestOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication { .. }));
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some("expired"));
    }

    #[tokio::test]
    async fn test_expired_token_without_retry() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = Connection::connect(
            config(&format!("{}/v1.0", server.uri())).with_retry_auth(false),
        )
        .await
        .unwrap();
        let err = connection
            .request(Method::GET, "/servers", RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::Connection(
                "Authentication token expired and you have requested not to retry".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_payload_too_large_is_rate_limited() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1.1/1234/servers"))
            .respond_with(
                ResponseTemplate::new(413)
                    .set_body_string("{\"overLimit\":{\"message\":\"Slow down\",\"code\":413}}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = connect(&server).await;
        let err = connection
            .request(
                Method::POST,
                "/servers",
                RequestOptions::new().with_body("{}"),
            )
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(err.status(), Some(413));
        assert_eq!(err.to_string(), "overLimit (status 413): Slow down");
    }

    #[tokio::test]
    async fn test_request_classifies_faults() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers/42"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(
                    "{\"itemNotFound\":{\"message\":\"Server not found\",\"code\":404}}",
                ),
            )
            .mount(&server)
            .await;

        let mut connection = connect(&server).await;
        let err = connection
            .request(Method::GET, "/servers/42", RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err.fault_kind(), Some(FaultKind::ItemNotFound));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_raw_request_does_not_classify() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let target = Endpoint::parse(&server.uri()).unwrap();
        let mut connection = Connection::new(config("https://identity.example.com/v1.0")).unwrap();
        let response = connection
            .raw_request(Method::GET, &target, "/status", HeaderMap::new(), None)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body, "maintenance");
    }

    #[tokio::test]
    async fn test_request_authenticates_lazily_and_sends_json() {
        let server = MockServer::start().await;
        mount_legacy_auth(&server, 1).await;
        Mock::given(method("PUT"))
            .and(path("/v1.1/1234/servers/42"))
            .and(header("Content-Type", "application/json"))
            .and(header("X-Auth-Token", "fresh-token"))
            .and(body_string("{\"server\":{\"name\":\"web\"}}"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = Connection::new(config(&format!("{}/v1.0", server.uri()))).unwrap();
        assert!(!connection.is_authenticated());
        assert_eq!(connection.auth_protocol(), AuthProtocol::Legacy);

        let options = RequestOptions::new()
            .with_json(&serde_json::json!({"server": {"name": "web"}}))
            .unwrap();
        let response = connection
            .request(Method::PUT, "/servers/42", options)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(connection.is_authenticated());
    }

    #[tokio::test]
    async fn test_request_with_target_override() {
        let server = MockServer::start().await;
        let other = MockServer::start().await;
        mount_legacy_auth(&server, 1).await;
        Mock::given(method("GET"))
            .and(path("/v2/5678/limits"))
            .and(header("X-Auth-Token", "fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&other)
            .await;

        let mut connection = connect(&server).await;
        let target = Endpoint::parse(&format!("{}/v2/5678", other.uri())).unwrap();
        let response = connection
            .request(
                Method::GET,
                "/limits",
                RequestOptions::new().with_target(target),
            )
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_request_without_management_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access": {"token": {"id": "t"}, "serviceCatalog": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = Connection::connect(config(&format!("{}/v2.0", server.uri())))
            .await
            .unwrap();
        assert_eq!(connection.auth_protocol(), AuthProtocol::Catalog);
        assert!(!connection.is_authenticated());

        let err = connection
            .request(Method::GET, "/servers", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_reauthentication_without_service_stops_replay() {
        let server = MockServer::start().await;
        let compute = format!("{}/v1.1/1234", server.uri());
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access": {
                    "token": {"id": "first-token"},
                    "serviceCatalog": [
                        {"type": "compute", "name": "nova", "endpoints": [{"publicURL": compute}]}
                    ]
                }
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access": {"token": {"id": "second-token"}, "serviceCatalog": []}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut connection = Connection::connect(config(&format!("{}/v2.0", server.uri())))
            .await
            .unwrap();
        assert!(connection.is_authenticated());

        let err = connection
            .request(Method::GET, "/servers", RequestOptions::new())
            .await
            .unwrap_err();

        assert_eq!(err, no_management_endpoint());
        assert!(!connection.is_authenticated());
        assert!(connection.management_endpoint().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_configuration() {
        let mut config = config("https://identity.example.com/v1.0");
        config.username = String::new();

        let err = Connection::connect(config).await.err().unwrap();
        assert_eq!(err, Error::MissingArgument("Must supply a username".to_string()));
    }
}
