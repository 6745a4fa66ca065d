//! Server, image, flavor and metadata accessors for OpenStack Compute.
//!
//! Every accessor is a thin translation of a method call into a request on a
//! [`compute_core::Connection`]; authentication, retries and fault
//! classification all happen there.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod flavors;
pub mod ids;
pub mod images;
pub mod metadata;
pub mod models;
pub mod personality;
pub mod servers;

#[cfg(test)]
mod test_support;

pub use client::ComputeClient;
pub use flavors::FlavorsApi;
pub use ids::{FlavorId, ImageId, ServerId};
pub use images::ImagesApi;
pub use metadata::MetadataApi;
pub use models::{
    Address, CreateServer, Flavor, FlavorRef, Image, ImageRef, Limits, Link, RateLimit,
    RateLimitGroup, RebootType, RebuildServer, Server, ServerRef, ServerSummary, UpdateServer,
};
pub use personality::PersonalityFile;
pub use servers::ServersApi;

/// Convenient result alias that reuses the shared compute error type.
pub type Result<T> = compute_core::Result<T>;
