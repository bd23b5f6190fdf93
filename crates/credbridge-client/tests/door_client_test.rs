//! Contract tests for HttpDoorClient.

use credbridge_client::{ClientError, DoorAction, DoorConfig, HttpDoorClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn door(server: &MockServer) -> HttpDoorClient {
    HttpDoorClient::new(DoorConfig {
        url: format!("{}/door/0/open", server.uri()).parse().unwrap(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn open_issues_a_single_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/door/0/open"))
        .respond_with(ResponseTemplate::new(200).set_body_string("opened"))
        .expect(1)
        .mount(&server)
        .await;

    let response = door(&server).open().await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "opened");
}

#[tokio::test]
async fn non_success_status_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("jammed"))
        .expect(1)
        .mount(&server)
        .await;

    match door(&server).open().await {
        Err(ClientError::Api { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "jammed");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_door_is_a_transport_error() {
    let client = HttpDoorClient::new(DoorConfig {
        url: "http://127.0.0.1:1/open".parse().unwrap(),
        timeout_secs: 1,
    })
    .unwrap();
    assert!(matches!(client.open().await, Err(ClientError::Http { .. })));
}
