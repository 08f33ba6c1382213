use std::io::Write;

use backend_utils::{
    header::HeaderMap,
    mock::{MockResponse, MockServer},
    BackoffStrategy, ClientError, ClientOptions, HttpClient, Method, StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Account {
    id: u64,
    name: String,
}

fn client(max_retries: usize) -> HttpClient {
    HttpClient::new().with_options(
        ClientOptions::default()
            .with_max_retries(max_retries)
            .with_backoff(BackoffStrategy::None),
    )
}

#[tokio::test]
async fn retries_through_scripted_sequence() {
    let server = MockServer::start().await.expect("must bind");
    server.add_sequence(
        Method::GET,
        "/accounts/1",
        vec![
            MockResponse::new(StatusCode::SERVICE_UNAVAILABLE, r#"{"error":"warming up"}"#),
            MockResponse::new(StatusCode::OK, r#"{"id":1,"name":"kit"}"#),
        ],
    );

    let account: Account = client(2)
        .get(&server.url("/accounts/1"), HeaderMap::new())
        .await
        .expect("second attempt succeeds");

    assert_eq!(account, Account { id: 1, name: "kit".to_owned() });
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn fixture_file_answers_every_call() {
    let mut fixture = tempfile::NamedTempFile::new().expect("temp file");
    write!(fixture, r#"{{"id":7,"name":"fixture"}}"#).expect("write fixture");

    let server = MockServer::start().await.expect("must bind");
    server
        .add_response_from_file(Method::POST, "accounts", StatusCode::CREATED, fixture.path())
        .expect("fixture exists");

    let client = client(0);
    for _ in 0..2 {
        let account: Account = client
            .post(&server.url("accounts"), serde_json::json!({"name": "fixture"}), HeaderMap::new())
            .await
            .expect("created");
        assert_eq!(account.id, 7);
    }
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn unscripted_route_surfaces_not_found_message() {
    let server = MockServer::start().await.expect("must bind");
    server.add_plain_responses(Method::DELETE, "/accounts/1", [(StatusCode::OK, "")]);

    let client = client(3);
    client
        .delete::<()>(&server.url("/accounts/1"), HeaderMap::new())
        .await
        .expect("first delete is scripted");

    let err = client
        .delete::<()>(&server.url("/accounts/1"), HeaderMap::new())
        .await
        .expect_err("sequence ran dry");
    assert_eq!(
        err.to_string(),
        "response not OK. 404 Not Found: mock response not found"
    );
    assert!(matches!(err, ClientError::NotOk { status, .. } if status == StatusCode::NOT_FOUND));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn delayed_response_trips_client_timeout() {
    let server = MockServer::start().await.expect("must bind");
    server.add_response(
        Method::GET,
        "/slow",
        MockResponse::new(StatusCode::OK, "{}").with_delay(std::time::Duration::from_millis(300)),
    );

    let client = HttpClient::new().with_options(
        ClientOptions::default().with_timeout(std::time::Duration::from_millis(30)),
    );
    let err = client
        .get::<serde_json::Value>(&server.url("/slow"), HeaderMap::new())
        .await
        .expect_err("must time out");
    assert!(matches!(err, ClientError::Transport(inner) if inner.is_timeout()));
}
