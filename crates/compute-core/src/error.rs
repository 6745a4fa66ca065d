//! Error types for compute operations.
//!
//! This module provides the error hierarchy surfaced by the connection core and
//! the closed taxonomy of compute API faults, together with [`classify`], which
//! maps a non-2xx response onto that taxonomy.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Main error type for compute operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument was absent or empty
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// An argument was present but malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A host could not be reached, or retries were exhausted
    #[error("Connection failure: {0}")]
    Connection(String),

    /// Credentials were rejected or no usable endpoint was found
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Human-readable reason
        message: String,
        /// HTTP status of the identity or API response, if one was received
        status: Option<u16>,
        /// Raw response body, if one was received
        body: Option<String>,
    },

    /// The API answered with a fault
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A successful response could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The HTTP client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// A personality file violated the server-creation limits
    #[error("Personality error: {0}")]
    Personality(String),
}

/// Specialized result type for compute operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) => "MISSING_ARGUMENT",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Connection(_) => "CONNECTION_FAILURE",
            Self::Authentication { .. } => "AUTHENTICATION_FAILURE",
            Self::Api(_) => "API_FAULT",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Personality(_) => "PERSONALITY_ERROR",
        }
    }

    /// Builds an authentication failure that carries no response.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// HTTP status attached to the error, when a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Api(fault) => Some(fault.status),
            _ => None,
        }
    }

    /// Raw response body attached to the error, when a response was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. } => body.as_deref(),
            Self::Api(fault) => Some(&fault.body),
            _ => None,
        }
    }

    /// Returns the API fault kind, if this is an API fault.
    #[must_use]
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::Api(fault) => Some(fault.kind),
            _ => None,
        }
    }

    /// Returns true if the API reported that the rate or quota limit was exceeded.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.fault_kind() == Some(FaultKind::OverLimit)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidArgument(format!("Invalid configuration: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Closed set of faults reported by the compute API.
///
/// The API names the fault with the single top-level key of the error body,
/// e.g. `{"itemNotFound": {"message": "...", "code": 404}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FaultKind {
    /// Generic server-side failure
    ComputeFault,
    /// The service is temporarily unavailable
    ServiceUnavailable,
    /// The token was not accepted for this operation
    Unauthorized,
    /// The request was malformed
    BadRequest,
    /// Rate or absolute limits were exceeded
    OverLimit,
    /// Unsupported content type
    BadMediaType,
    /// Method not allowed on the resource
    BadMethod,
    /// The resource does not exist
    ItemNotFound,
    /// The server is still building
    BuildInProgress,
    /// No capacity to build the server
    ServerCapacityUnavailable,
    /// A backup or resize is already running
    BackupOrResizeInProgress,
    /// The resize request was refused
    ResizeNotAllowed,
    /// The operation is not implemented by the provider
    NotImplemented,
    /// Anything else, including unparseable fault bodies
    Other,
}

impl FaultKind {
    /// Looks up the fault named by a response body's discriminator key.
    #[must_use]
    pub fn from_discriminator(key: &str) -> Option<Self> {
        let kind = match key {
            "computeFault" => Self::ComputeFault,
            "serviceUnavailable" => Self::ServiceUnavailable,
            "unauthorized" => Self::Unauthorized,
            "badRequest" => Self::BadRequest,
            "overLimit" => Self::OverLimit,
            "badMediaType" => Self::BadMediaType,
            "badMethod" => Self::BadMethod,
            "itemNotFound" => Self::ItemNotFound,
            "buildInProgress" => Self::BuildInProgress,
            "serverCapacityUnavailable" => Self::ServerCapacityUnavailable,
            "backupOrResizeInProgress" => Self::BackupOrResizeInProgress,
            "resizeNotAllowed" => Self::ResizeNotAllowed,
            "notImplemented" => Self::NotImplemented,
            "other" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the discriminator key the API uses for this fault.
    #[must_use]
    pub const fn discriminator(&self) -> &'static str {
        match self {
            Self::ComputeFault => "computeFault",
            Self::ServiceUnavailable => "serviceUnavailable",
            Self::Unauthorized => "unauthorized",
            Self::BadRequest => "badRequest",
            Self::OverLimit => "overLimit",
            Self::BadMediaType => "badMediaType",
            Self::BadMethod => "badMethod",
            Self::ItemNotFound => "itemNotFound",
            Self::BuildInProgress => "buildInProgress",
            Self::ServerCapacityUnavailable => "serverCapacityUnavailable",
            Self::BackupOrResizeInProgress => "backupOrResizeInProgress",
            Self::ResizeNotAllowed => "resizeNotAllowed",
            Self::NotImplemented => "notImplemented",
            Self::Other => "other",
        }
    }

    /// Returns the error code for programmatic handling.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ComputeFault => "COMPUTE_FAULT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::OverLimit => "OVER_LIMIT",
            Self::BadMediaType => "BAD_MEDIA_TYPE",
            Self::BadMethod => "BAD_METHOD",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::BuildInProgress => "BUILD_IN_PROGRESS",
            Self::ServerCapacityUnavailable => "SERVER_CAPACITY_UNAVAILABLE",
            Self::BackupOrResizeInProgress => "BACKUP_OR_RESIZE_IN_PROGRESS",
            Self::ResizeNotAllowed => "RESIZE_NOT_ALLOWED",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// A fault returned by the compute API.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} (status {status}): {message}")]
pub struct ApiError {
    /// Fault kind
    pub kind: FaultKind,
    /// Message taken from the fault body
    pub message: String,
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl ApiError {
    /// Creates a new fault.
    #[must_use]
    pub fn new(kind: FaultKind, message: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            body: body.into(),
        }
    }

    /// Fallback for bodies that do not name a known fault.
    #[must_use]
    pub fn unrecognized(status: u16, body: impl Into<String>) -> Self {
        Self::new(FaultKind::Other, generic_message(status), status, body)
    }

    /// Builds the rate-limit fault raised for HTTP 413, whatever the body names.
    #[must_use]
    pub fn rate_limited(status: StatusCode, body: &str) -> Self {
        let classified =
            classify(status, body).unwrap_or_else(|| Self::unrecognized(status.as_u16(), body));
        Self {
            kind: FaultKind::OverLimit,
            ..classified
        }
    }
}

fn generic_message(status: u16) -> String {
    format!("The server returned status {status}")
}

/// Classifies a response into a compute fault.
///
/// Returns `None` for 2xx statuses. Any other status yields a fault: the kind
/// named by the body's single top-level key when it is known, otherwise
/// [`FaultKind::Other`]. Malformed bodies never cause this function to fail.
#[must_use]
pub fn classify(status: StatusCode, body: &str) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }

    let code = status.as_u16();
    let fault = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.len() == 1 => map.into_iter().next(),
        _ => None,
    };

    let classified = fault.and_then(|(key, info)| {
        let kind = FaultKind::from_discriminator(&key)?;
        let message = info
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| generic_message(code), str::to_string);
        Some(ApiError::new(kind, message, code, body))
    });

    Some(classified.unwrap_or_else(|| ApiError::unrecognized(code, body)))
}
