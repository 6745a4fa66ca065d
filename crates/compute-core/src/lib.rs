//! # compute-core
//!
//! Connection core for OpenStack Compute clients.
//!
//! This crate owns everything a resource accessor needs before it can issue a
//! single API call: credentials and configuration, the two identity protocols,
//! the per-host transport pool, and the request pipeline that retries transient
//! faults and expired tokens before surfacing a typed error.
//!
//! ## Modules
//!
//! - [`endpoint`] - Parsed URL descriptors (scheme, host, port, path)
//! - [`error`] - Error types and compute fault classification
//! - [`config`] - Connection configuration and credentials
//! - [`client`] - Transport settings and retry limits
//! - [`session`] - Per-connection authentication state
//! - [`auth`] - Legacy header and service catalog authentication
//! - [`transport`] - Pooled HTTP transport
//! - [`connection`] - The request pipeline
//! - [`query`] - Query-string helpers for pagination

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use auth::AuthProtocol;
pub use config::{ConnectionConfig, Credentials, ServiceSelection};
pub use connection::{Connection, RequestOptions};
pub use endpoint::{Endpoint, Scheme};
pub use error::{classify, ApiError, Error, FaultKind, Result};
pub use query::{Pagination, QueryParams};
pub use transport::{RawRequest, RawResponse, Transport, TransportError, TransportPool};
