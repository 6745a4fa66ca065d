use crate::ComputeClient;
use compute_core::ConnectionConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a mock server that accepts legacy authentication and returns a
/// client connected to it. The management path is `/v1.1/1234`.
pub(crate) async fn legacy_client() -> (MockServer, ComputeClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0"))
        .respond_with(
            ResponseTemplate::new(204)
                .insert_header("X-Auth-Token", "test-token")
                .insert_header(
                    "X-Server-Management-Url",
                    format!("{}/v1.1/1234", server.uri()).as_str(),
                ),
        )
        .mount(&server)
        .await;

    let config =
        ConnectionConfig::new("demo", "secret-key", format!("{}/v1.0", server.uri())).unwrap();
    let client = ComputeClient::connect(config).await.unwrap();
    (server, client)
}
