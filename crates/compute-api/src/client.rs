//! Compute client and the JSON helpers shared by every accessor.

use crate::flavors::FlavorsApi;
use crate::ids::{ImageId, ServerId};
use crate::images::ImagesApi;
use crate::metadata::MetadataApi;
use crate::models::Limits;
use crate::servers::ServersApi;
use crate::Result;
use compute_core::{Connection, ConnectionConfig, Error, RawResponse, RequestOptions};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Client for a compute service.
///
/// Owns one [`Connection`]; accessors borrow it mutably, so calls run one at
/// a time.
pub struct ComputeClient {
    connection: Connection,
}

impl ComputeClient {
    /// Build a connection, authenticate it and wrap it.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, or the failure reported by
    /// [`Connection::authenticate`].
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let connection = Connection::connect(config).await?;
        Ok(Self::from_connection(connection))
    }

    /// Wrap an existing connection.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// Return the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Return the underlying connection mutably, e.g. to issue raw requests.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Unwrap the connection.
    #[must_use]
    pub fn into_connection(self) -> Connection {
        self.connection
    }

    /// Server operations.
    pub fn servers(&mut self) -> ServersApi<'_> {
        ServersApi::new(&mut self.connection)
    }

    /// Image operations.
    pub fn images(&mut self) -> ImagesApi<'_> {
        ImagesApi::new(&mut self.connection)
    }

    /// Flavor operations.
    pub fn flavors(&mut self) -> FlavorsApi<'_> {
        FlavorsApi::new(&mut self.connection)
    }

    /// Metadata of one server.
    pub fn server_metadata(&mut self, id: &ServerId) -> MetadataApi<'_> {
        MetadataApi::new(&mut self.connection, format!("/servers/{}/meta", id.path_segment()))
    }

    /// Metadata of one image.
    pub fn image_metadata(&mut self, id: &ImageId) -> MetadataApi<'_> {
        MetadataApi::new(&mut self.connection, format!("/images/{}/meta", id.path_segment()))
    }

    /// Current rate and absolute limits of the account.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure. Returns
    /// [`compute_core::Error::Parse`] if the body does not match the expected shape.
    pub async fn limits(&mut self) -> Result<Limits> {
        get_json(&mut self.connection, "/limits", "limits").await
    }
}

pub(crate) async fn get_json<T>(connection: &mut Connection, path: &str, key: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = connection
        .request(Method::GET, path, RequestOptions::new())
        .await?;
    extract(&response, key, path)
}

pub(crate) async fn send_json<B>(
    connection: &mut Connection,
    method: Method,
    path: &str,
    body: &B,
) -> Result<RawResponse>
where
    B: Serialize + ?Sized,
{
    let options = RequestOptions::new().with_json(body)?;
    connection.request(method, path, options).await
}

pub(crate) async fn delete(connection: &mut Connection, path: &str) -> Result<()> {
    connection
        .request(Method::DELETE, path, RequestOptions::new())
        .await?;
    Ok(())
}

/// Pulls `key` out of a `{"key": ...}` envelope.
pub(crate) fn extract<T>(response: &RawResponse, key: &str, path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut envelope: Value = serde_json::from_str(&response.body).map_err(|err| {
        Error::Parse(format!("Failed to parse compute response for `{path}`: {err}"))
    })?;
    let inner = envelope
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| Error::Parse(format!("Compute response for `{path}` has no `{key}` member")))?;

    serde_json::from_value(inner).map_err(|err| {
        Error::Parse(format!("Failed to parse compute response for `{path}`: {err}"))
    })
}
