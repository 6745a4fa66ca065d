//! Key/value metadata attached to servers and images.

use crate::client::{delete, get_json, send_json};
use crate::Result;
use compute_core::{Connection, Error, RequestOptions};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Accessor for one resource's `/meta` collection.
pub struct MetadataApi<'a> {
    connection: &'a mut Connection,
    base: String,
}

impl<'a> MetadataApi<'a> {
    pub(crate) fn new(connection: &'a mut Connection, base: String) -> Self {
        Self { connection, base }
    }

    /// Path of the collection, relative to the management endpoint.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base
    }

    fn item_path(&self, key: &str) -> String {
        format!("{}/{}", self.base, urlencoding::encode(key))
    }

    /// Fetch every metadata entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn get_data(&mut self) -> Result<HashMap<String, String>> {
        get_json(self.connection, &self.base, "metadata").await
    }

    /// Merge `data` into the existing entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_data(&mut self, data: &HashMap<String, String>) -> Result<()> {
        send_json(self.connection, Method::POST, &self.base, &json!({ "metadata": data })).await?;
        Ok(())
    }

    /// Fetch a single entry.
    ///
    /// The value is read from the `{key: value}` body, or from a `meta`
    /// envelope around it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn get_item(&mut self, key: &str) -> Result<String> {
        let path = self.item_path(key);
        let response = self
            .connection
            .request(Method::GET, &path, RequestOptions::new())
            .await?;

        let body: Map<String, Value> = serde_json::from_str(&response.body)?;
        let item = match body.get("meta") {
            Some(Value::Object(meta)) if !body.contains_key(key) => meta.get(key),
            _ => body.get(key),
        };

        item.and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Parse(format!("Metadata response for `{path}` has no `{key}` entry")))
    }

    /// Create or replace a single entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key);
        let mut body = Map::new();
        body.insert(key.to_string(), Value::String(value.to_string()));
        send_json(self.connection, Method::PUT, &path, &body).await?;
        Ok(())
    }

    /// Remove a single entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_item(&mut self, key: &str) -> Result<()> {
        let path = self.item_path(key);
        delete(self.connection, &path).await
    }
}

#[cfg(test)]
mod tests {
    use crate::ids::{ImageId, ServerId};
    use crate::test_support::legacy_client;
    use compute_core::FaultKind;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn server_metadata_round_trip() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers/42/meta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"role": "db", "tier": "gold"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.1/1234/servers/42/meta"))
            .and(body_json(json!({"metadata": {"owner": "ops"}})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let id = ServerId::from(42);
        let mut metadata = client.server_metadata(&id);
        assert_eq!(metadata.base_path(), "/servers/42/meta");

        let data = metadata.get_data().await.unwrap();
        assert_eq!(data.get("role").map(String::as_str), Some("db"));

        let update = HashMap::from([("owner".to_string(), "ops".to_string())]);
        metadata.set_data(&update).await.unwrap();
    }

    #[tokio::test]
    async fn image_metadata_items() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/images/7/meta/os"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"os": "linux"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/images/7/meta/arch"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"meta": {"arch": "x86_64"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1.1/1234/images/7/meta/os"))
            .and(body_json(json!({"os": "bsd"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1.1/1234/images/7/meta/os"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = ImageId::from(7);
        let mut metadata = client.image_metadata(&id);
        assert_eq!(metadata.get_item("os").await.unwrap(), "linux");
        assert_eq!(metadata.get_item("arch").await.unwrap(), "x86_64");
        metadata.set_item("os", "bsd").await.unwrap();
        metadata.delete_item("os").await.unwrap();
    }

    #[tokio::test]
    async fn metadata_keys_are_percent_encoded() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers/7/meta/x%2Fy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"x/y": "slash"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1.1/1234/servers/7/meta/a%23b%3Fc"))
            .and(body_json(json!({"a#b?c": "odd"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let id = ServerId::from(7);
        let mut metadata = client.server_metadata(&id);
        assert_eq!(metadata.get_item("x/y").await.unwrap(), "slash");
        metadata.set_item("a#b?c", "odd").await.unwrap();
    }

    #[tokio::test]
    async fn missing_item_is_a_fault() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/servers/42/meta/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "itemNotFound": {"message": "Metadata item was not found", "code": 404}
            })))
            .mount(&server)
            .await;

        let err = client
            .server_metadata(&ServerId::from(42))
            .get_item("nope")
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::ItemNotFound));
    }
}
