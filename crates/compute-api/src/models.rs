//! Compute API models.

use crate::ids::{FlavorId, ImageId, ServerId};
use crate::personality::PersonalityFile;
use chrono::{DateTime, Utc};
use compute_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address label listed first when picking a server's primary address.
pub const PUBLIC_ADDRESS_LABEL: &str = "public";

/// Hypermedia link attached to a resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    /// Relation, e.g. `self` or `bookmark`.
    #[serde(default)]
    pub rel: Option<String>,
    /// Target URL.
    pub href: String,
}

/// Server entry returned by the plain `/servers` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSummary {
    /// Server id.
    pub id: ServerId,
    /// Server name.
    pub name: String,
    /// Links to the server.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Reference to the image a server was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    /// Image id.
    pub id: ImageId,
    /// Links to the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Reference to a server's flavor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlavorRef {
    /// Flavor id.
    pub id: FlavorId,
    /// Links to the flavor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Reference to the server an image was taken from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerRef {
    /// Server id.
    pub id: ServerId,
}

/// One network address of a server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// IP version, 4 or 6.
    pub version: u8,
    /// Address literal.
    pub addr: String,
}

/// Full server representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    /// Server id.
    pub id: ServerId,
    /// Server name.
    #[serde(default)]
    pub name: String,
    /// Lifecycle status, e.g. `ACTIVE` or `BUILD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Build progress in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Opaque host identifier.
    #[serde(rename = "hostId", default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// Image the server was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    /// Server flavor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<FlavorRef>,
    /// Addresses keyed by network label.
    #[serde(default)]
    pub addresses: HashMap<String, Vec<Address>>,
    /// User metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Public IPv4 address set by the provider.
    #[serde(rename = "accessIPv4", default, skip_serializing_if = "Option::is_none")]
    pub access_ipv4: Option<String>,
    /// Public IPv6 address set by the provider.
    #[serde(rename = "accessIPv6", default, skip_serializing_if = "Option::is_none")]
    pub access_ipv6: Option<String>,
    /// Root password, only present in the create response.
    #[serde(rename = "adminPass", default, skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Links to the server.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Server {
    /// Public IPv4 address: `accessIPv4` when set, otherwise the first v4
    /// address, looking at the `public` network before the others.
    #[must_use]
    pub fn access_ipv4(&self) -> Option<&str> {
        non_empty(self.access_ipv4.as_deref()).or_else(|| self.first_address(4))
    }

    /// Public IPv6 address, resolved the same way as [`Server::access_ipv4`].
    #[must_use]
    pub fn access_ipv6(&self) -> Option<&str> {
        non_empty(self.access_ipv6.as_deref()).or_else(|| self.first_address(6))
    }

    /// Addresses on the network with the given label.
    #[must_use]
    pub fn addresses_for(&self, label: &str) -> &[Address] {
        self.addresses.get(label).map_or(&[], Vec::as_slice)
    }

    fn first_address(&self, version: u8) -> Option<&str> {
        let mut labels: Vec<&String> = self.addresses.keys().collect();
        labels.sort_by_key(|label| (label.as_str() != PUBLIC_ADDRESS_LABEL, label.as_str()));

        labels
            .into_iter()
            .flat_map(|label| self.addresses_for(label))
            .find(|address| address.version == version)
            .map(|address| address.addr.as_str())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Request body for `POST /servers`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateServer {
    /// Server name.
    pub name: String,
    /// Image to build from.
    #[serde(rename = "imageRef")]
    pub image_ref: ImageId,
    /// Flavor to build with.
    #[serde(rename = "flavorRef")]
    pub flavor_ref: FlavorId,
    /// User metadata.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Files injected at build time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personality: Vec<PersonalityFile>,
}

impl CreateServer {
    /// Create a request with the three required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, image_ref: ImageId, flavor_ref: FlavorId) -> Self {
        Self {
            name: name.into(),
            image_ref,
            flavor_ref,
            metadata: HashMap::new(),
            personality: Vec::new(),
        }
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach personality files, see [`crate::personality::load`].
    #[must_use]
    pub fn with_personality(mut self, files: Vec<PersonalityFile>) -> Self {
        self.personality = files;
        self
    }

    /// Checks that name, image and flavor are all supplied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] if any of them is empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty()
            || self.image_ref.as_str().is_empty()
            || self.flavor_ref.as_str().is_empty()
        {
            return Err(Error::MissingArgument(
                "Server name, flavorRef, and imageRef must be supplied".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request body for `PUT /servers/{id}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateServer {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New root password.
    #[serde(rename = "adminPass", skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
}

impl UpdateServer {
    /// Rename the server.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Change the root password.
    #[must_use]
    pub fn with_admin_pass(mut self, pass: impl Into<String>) -> Self {
        self.admin_pass = Some(pass.into());
        self
    }
}

/// Reboot flavour for the `reboot` action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebootType {
    /// Graceful OS-level reboot
    #[default]
    Soft,
    /// Power cycle
    Hard,
}

/// Body of the `rebuild` action.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RebuildServer {
    /// Image to rebuild from.
    #[serde(rename = "imageRef")]
    pub image_ref: ImageId,
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New root password.
    #[serde(rename = "adminPass", skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    /// Replacement metadata.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Files injected at rebuild time.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personality: Vec<PersonalityFile>,
}

impl RebuildServer {
    /// Rebuild from `image_ref`, keeping everything else.
    #[must_use]
    pub fn new(image_ref: ImageId) -> Self {
        Self {
            image_ref,
            name: None,
            admin_pass: None,
            metadata: HashMap::new(),
            personality: Vec::new(),
        }
    }

    /// Rename the server while rebuilding.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the root password.
    #[must_use]
    pub fn with_admin_pass(mut self, pass: impl Into<String>) -> Self {
        self.admin_pass = Some(pass.into());
        self
    }

    /// Attach personality files.
    #[must_use]
    pub fn with_personality(mut self, files: Vec<PersonalityFile>) -> Self {
        self.personality = files;
        self
    }
}

/// Server image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    /// Image id.
    pub id: ImageId,
    /// Image name.
    #[serde(default)]
    pub name: String,
    /// Status, e.g. `ACTIVE` or `SAVING`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Snapshot progress in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Minimum disk in GB.
    #[serde(rename = "minDisk", default, skip_serializing_if = "Option::is_none")]
    pub min_disk: Option<u32>,
    /// Minimum RAM in MB.
    #[serde(rename = "minRam", default, skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<u32>,
    /// Server the image was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerRef>,
    /// User metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Links to the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Server flavor (hardware profile).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flavor {
    /// Flavor id.
    pub id: FlavorId,
    /// Flavor name.
    #[serde(default)]
    pub name: String,
    /// RAM in MB.
    #[serde(default)]
    pub ram: u32,
    /// Disk in GB.
    #[serde(default)]
    pub disk: u32,
    /// Virtual CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u32>,
    /// Links to the flavor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Rate and absolute limits of the account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Limits {
    /// Rate limits, grouped by URI.
    #[serde(default)]
    pub rate: Vec<RateLimitGroup>,
    /// Absolute limits, e.g. `maxTotalRAMSize`.
    #[serde(default)]
    pub absolute: HashMap<String, i64>,
}

/// Rate limits applying to one URI pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitGroup {
    /// Human-readable URI pattern.
    #[serde(default)]
    pub uri: String,
    /// Regex matched against request paths.
    #[serde(default)]
    pub regex: String,
    /// Limits per HTTP verb.
    #[serde(default)]
    pub limit: Vec<RateLimit>,
}

/// One rate limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimit {
    /// HTTP verb the limit applies to.
    pub verb: String,
    /// Allowed requests per unit.
    pub value: u64,
    /// Requests left in the current window.
    pub remaining: u64,
    /// Window unit, e.g. `MINUTE`.
    pub unit: String,
    /// When the window resets.
    #[serde(rename = "next-available", default, skip_serializing_if = "Option::is_none")]
    pub next_available: Option<String>,
}
