//! Server operations.

use crate::client::{delete, extract, get_json, send_json};
use crate::ids::{FlavorId, ImageId, ServerId};
use crate::models::{CreateServer, RebootType, RebuildServer, Server, ServerSummary, UpdateServer};
use crate::Result;
use chrono::Utc;
use compute_core::{Connection, Error, Pagination, RawResponse};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

/// Accessor for `/servers`.
pub struct ServersApi<'a> {
    connection: &'a mut Connection,
}

impl<'a> ServersApi<'a> {
    pub(crate) fn new(connection: &'a mut Connection) -> Self {
        Self { connection }
    }

    /// List servers by id and name.
    ///
    /// A `cacheid` parameter with the current time is appended so caching
    /// proxies never answer with a stale listing.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure. Returns
    /// [`compute_core::Error::Parse`] if the body does not match the expected shape.
    pub async fn list_servers(&mut self, page: Pagination) -> Result<Vec<ServerSummary>> {
        let mut params = page.to_params();
        params.push("cacheid", Utc::now().timestamp());
        let path = params.append_to("/servers");
        get_json(self.connection, &path, "servers").await
    }

    /// List servers with all their details.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure. Returns
    /// [`compute_core::Error::Parse`] if the body does not match the expected shape.
    pub async fn list_servers_detail(&mut self, page: Pagination) -> Result<Vec<Server>> {
        let path = page.to_params().append_to("/servers/detail");
        get_json(self.connection, &path, "servers").await
    }

    /// Fetch one server.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure. Returns
    /// [`compute_core::Error::Parse`] if the body does not match the expected shape.
    pub async fn get_server(&mut self, id: &ServerId) -> Result<Server> {
        get_json(self.connection, &format!("/servers/{}", id.path_segment()), "server").await
    }

    /// Create a server. The returned server carries the generated `adminPass`.
    ///
    /// # Errors
    ///
    /// Returns [`compute_core::Error::MissingArgument`] if the name, image or
    /// flavor is empty. Otherwise as for [`ServersApi::get_server`].
    pub async fn create_server(&mut self, request: &CreateServer) -> Result<Server> {
        request.validate()?;
        let response = send_json(
            self.connection,
            Method::POST,
            "/servers",
            &json!({ "server": request }),
        )
        .await?;
        let server: Server = extract(&response, "server", "/servers")?;
        info!(id = %server.id, name = %request.name, "server created");
        Ok(server)
    }

    /// Rename a server or change its root password.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn update_server(&mut self, id: &ServerId, update: &UpdateServer) -> Result<()> {
        send_json(
            self.connection,
            Method::PUT,
            &format!("/servers/{}", id.path_segment()),
            &json!({ "server": update }),
        )
        .await?;
        Ok(())
    }

    /// Delete a server.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn delete_server(&mut self, id: &ServerId) -> Result<()> {
        delete(self.connection, &format!("/servers/{}", id.path_segment())).await
    }

    /// Reboot a server.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn reboot(&mut self, id: &ServerId, reboot: RebootType) -> Result<()> {
        self.action(id, &json!({ "reboot": { "type": reboot } }))
            .await
            .map(drop)
    }

    /// Rebuild a server from an image.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn rebuild(&mut self, id: &ServerId, rebuild: &RebuildServer) -> Result<()> {
        self.action(id, &json!({ "rebuild": rebuild })).await.map(drop)
    }

    /// Resize a server to another flavor.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn resize(&mut self, id: &ServerId, flavor: &FlavorId) -> Result<()> {
        self.action(id, &json!({ "resize": { "flavorRef": flavor } }))
            .await
            .map(drop)
    }

    /// Accept a finished resize.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn confirm_resize(&mut self, id: &ServerId) -> Result<()> {
        self.action(id, &json!({ "confirmResize": Value::Null }))
            .await
            .map(drop)
    }

    /// Roll back a finished resize.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn revert_resize(&mut self, id: &ServerId) -> Result<()> {
        self.action(id, &json!({ "revertResize": Value::Null }))
            .await
            .map(drop)
    }

    /// Set a new root password.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure.
    pub async fn change_password(&mut self, id: &ServerId, password: &str) -> Result<()> {
        self.action(id, &json!({ "changePassword": { "adminPass": password } }))
            .await
            .map(drop)
    }

    /// Snapshot a server; returns the id of the new image.
    ///
    /// # Errors
    ///
    /// Returns the [`compute_core::Error`] of the request pipeline: an API fault
    /// for non-2xx answers, or an authentication or connection failure. Returns
    /// [`compute_core::Error::Parse`] if the `Location` header is missing or empty.
    pub async fn create_image(&mut self, id: &ServerId, name: &str) -> Result<ImageId> {
        let response = self
            .action(id, &json!({ "createImage": { "name": name } }))
            .await?;

        let location = response.header("location").ok_or_else(|| {
            Error::Parse("createImage response carried no Location header".to_string())
        })?;
        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(ImageId::from)
            .ok_or_else(|| Error::Parse(format!("Invalid image location `{location}`")))
    }

    async fn action<B: Serialize>(&mut self, id: &ServerId, body: &B) -> Result<RawResponse> {
        send_json(
            self.connection,
            Method::POST,
            &format!("/servers/{}/action", id.path_segment()),
            body,
        )
        .await
    }
}
