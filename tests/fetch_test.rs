use std::time::Duration;

use vidscribe::fetch::{Fetch, HttpFetcher};
use vidscribe::PipelineError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn given_ok_response_when_fetching_then_body_is_written_to_destination() {
    let server = MockServer::start().await;
    let payload = vec![7u8; 256 * 1024];
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("source.mp4");
    std::fs::write(&destination, b"stale content from an earlier run that is longer").unwrap();

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let saved = tokio_test::assert_ok!(
        fetcher
            .fetch(&format!("{}/uc?export=download&id=ABC123", server.uri()), &destination)
            .await
    );

    assert_eq!(saved, destination);
    assert_eq!(std::fs::read(&destination).unwrap(), payload);
}

#[tokio::test]
async fn given_not_found_when_fetching_then_returns_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let result = fetcher
        .fetch(&format!("{}/uc?id=missing", server.uri()), &dir.path().join("x.mp4"))
        .await;

    match result {
        Err(PipelineError::Fetch(msg)) => assert!(msg.contains("404"), "{}", msg),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn given_slow_server_when_fetching_then_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
    let result = fetcher
        .fetch(&format!("{}/uc?id=slow", server.uri()), &dir.path().join("x.mp4"))
        .await;

    match result {
        Err(PipelineError::Fetch(msg)) => assert!(msg.contains("timed out"), "{}", msg),
        other => panic!("expected timeout, got {:?}", other),
    }
}
