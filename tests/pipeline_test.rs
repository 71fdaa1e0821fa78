use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use vidscribe::config::TranscriptionConfig;
use vidscribe::fetch::HttpFetcher;
use vidscribe::job::{ApiKey, Job, JobQueue, JobRunner, Outcome, WorkerPool};
use vidscribe::notify::WebhookNotifier;
use vidscribe::server::{create_router, AppState};
use vidscribe::source::SourceResolver;
use vidscribe::transcode::PassthroughTranscoder;
use vidscribe::transcribe::WhisperTranscriber;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_source_and_whisper(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", "ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 fake mp3 frames".to_vec()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello from the drive"})))
        .mount(server)
        .await;
}

fn runner_against(server: &MockServer, staging_root: &std::path::Path) -> JobRunner {
    JobRunner::new(
        SourceResolver::new(format!("{}/uc?export=download&id=", server.uri())),
        Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap()),
        Arc::new(PassthroughTranscoder),
        Arc::new(WhisperTranscriber::new(&TranscriptionConfig {
            base_url: format!("{}/v1", server.uri()),
            ..TranscriptionConfig::default()
        })),
        Arc::new(WebhookNotifier::new(Duration::from_secs(5))),
        staging_root.to_path_buf(),
    )
}

#[tokio::test]
async fn given_reachable_services_when_job_runs_then_transcript_reaches_callback() {
    let server = MockServer::start().await;
    mount_source_and_whisper(&server).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({
            "status": "success",
            "row_id": 9,
            "transcript": "hello from the drive",
            "file_id": "ABC123"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let runner = runner_against(&server, staging.path());

    let outcome = runner
        .run(Job::new(
            "https://drive.google.com/file/d/ABC123/view?usp=sharing",
            format!("{}/hook", server.uri()),
            json!(9),
            ApiKey::new("sk-test"),
        ))
        .await;

    assert!(outcome.is_success());
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    server.verify().await;
}

#[tokio::test]
async fn given_missing_source_file_when_job_runs_then_error_reaches_callback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({
            "status": "error",
            "row_id": "r-1",
            "error": "Download failed: HTTP 404 Not Found"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let runner = runner_against(&server, staging.path());

    let outcome = runner
        .run(Job::new(
            "https://drive.google.com/open?id=ABC123",
            format!("{}/hook", server.uri()),
            json!("r-1"),
            ApiKey::new("sk-test"),
        ))
        .await;

    assert!(matches!(outcome, Outcome::Failure { .. }));
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    server.verify().await;
}

#[tokio::test]
async fn given_accepted_request_when_pool_is_running_then_callback_arrives_after_response() {
    let server = MockServer::start().await;
    mount_source_and_whisper(&server).await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let staging = tempfile::tempdir().unwrap();
    let runner = Arc::new(runner_against(&server, staging.path()));
    let (queue, receiver) = JobQueue::bounded(4);
    let pool = WorkerPool::start(runner, receiver, 2);
    let app = create_router(AppState { queue });

    let body = json!({
        "google_drive_url": "https://drive.google.com/file/d/ABC123/view",
        "callback_url": format!("{}/hook", server.uri()),
        "row_id": 77,
        "openai_api_key": "sk-test"
    });
    let request = Request::builder()
        .method("POST")
        .uri("/process-video")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The router owned the last queue handle; once it is gone the pool drains.
    pool.shutdown().await;

    let hooks: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/hook")
        .collect();
    assert_eq!(hooks.len(), 1);
    let delivered: serde_json::Value = serde_json::from_slice(&hooks[0].body).unwrap();
    assert_eq!(delivered["status"], "success");
    assert_eq!(delivered["row_id"], 77);
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}
