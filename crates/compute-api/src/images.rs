//! Image operations.

use crate::client::{delete, get_json};
use crate::ids::ImageId;
use crate::models::Image;
use crate::Result;
use compute_core::{Connection, Pagination};

/// Accessor for `/images`.
pub struct ImagesApi<'a> {
    connection: &'a mut Connection,
}

impl<'a> ImagesApi<'a> {
    pub(crate) fn new(connection: &'a mut Connection) -> Self {
        Self { connection }
    }

    /// List images with their details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn list_images(&mut self, page: Pagination) -> Result<Vec<Image>> {
        let path = page.to_params().append_to("/images/detail");
        get_json(self.connection, &path, "images").await
    }

    /// Fetch one image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    pub async fn get_image(&mut self, id: &ImageId) -> Result<Image> {
        get_json(self.connection, &format!("/images/{}", id.path_segment()), "image").await
    }

    /// Delete an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_image(&mut self, id: &ImageId) -> Result<()> {
        delete(self.connection, &format!("/images/{}", id.path_segment())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::legacy_client;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn list_images_with_limit() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/images/detail"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{
                    "id": 2,
                    "name": "CentOS 5.2",
                    "status": "ACTIVE",
                    "created": "2009-07-20T09:16:57Z",
                    "updated": "2009-07-20T09:16:57Z",
                    "minDisk": 10,
                    "minRam": 256
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let images = client
            .images()
            .list_images(Pagination::new().with_limit(1))
            .await
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "CentOS 5.2");
        assert_eq!(images[0].min_ram, Some(256));
        assert!(images[0].created.is_some());
    }

    #[tokio::test]
    async fn get_and_delete_image() {
        let (server, mut client) = legacy_client().await;
        Mock::given(method("GET"))
            .and(path("/v1.1/1234/images/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "image": {"id": "7", "name": "nightly", "status": "SAVING", "progress": 40,
                          "server": {"id": 42}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1.1/1234/images/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = ImageId::from(7);
        let image = client.images().get_image(&id).await.unwrap();
        assert_eq!(image.progress, Some(40));
        assert_eq!(image.server.unwrap().id.as_str(), "42");

        client.images().delete_image(&id).await.unwrap();
    }
}
