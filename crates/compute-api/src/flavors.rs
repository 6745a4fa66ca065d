//! Flavor operations.

use crate::client::get_json;
use crate::ids::FlavorId;
use crate::models::Flavor;
use crate::Result;
use compute_core::{Connection, Pagination};

/// Accessor for `/flavors`.
pub struct FlavorsApi<'a> {
    connection: &'a mut Connection,
}

impl<'a> FlavorsApi<'a> {
    pub(crate) fn new(connection: &'a mut Connection) -> Self {
        Self { connection }
    }

    /// List flavors with their details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn list_flavors(&mut self, page: Pagination) -> Result<Vec<Flavor>> {
        let path = page.to_params().append_to("/flavors/detail");
        get_json(self.connection, &path, "flavors").await
    }

    /// Fetch one flavor.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn get_flavor(&mut self, id: &FlavorId) -> Result<Flavor> {
        get_json(self.connection, &format!("/flavors/{}", id.path_segment()), "flavor").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::legacy_client;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn list_and_get_flavors() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/flavors/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavors": [
                    {"id": 1, "name": "256 server", "ram": 256, "disk": 10},
                    {"id": 2, "name": "512 server", "ram": 512, "disk": 20, "vcpus": 1}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/flavors/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavor": {"id": 2, "name": "512 server", "ram": 512, "disk": 20}
            })))
            .mount(&server)
            .await;

        let flavors = client
            .flavors()
            .list_flavors(Pagination::default())
            .await
            .unwrap();
        assert_eq!(flavors.len(), 2);
        assert_eq!(flavors[1].vcpus, Some(1));

        let flavor = client.flavors().get_flavor(&FlavorId::from(2)).await.unwrap();
        assert_eq!(flavor.ram, 512);
        assert_eq!(flavor.disk, 20);
    }
}
