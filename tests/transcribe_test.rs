use serde_json::json;
use vidscribe::config::TranscriptionConfig;
use vidscribe::transcribe::{ApiKey, Transcribe, WhisperTranscriber};
use vidscribe::PipelineError;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transcriber_for(server: &MockServer) -> WhisperTranscriber {
    WhisperTranscriber::new(&TranscriptionConfig {
        base_url: format!("{}/v1", server.uri()),
        ..TranscriptionConfig::default()
    })
}

fn audio_file(dir: &tempfile::TempDir, len: u64) -> std::path::PathBuf {
    let path = dir.path().join("clip_audio.mp3");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(len).unwrap();
    path
}

#[tokio::test]
async fn given_small_audio_when_transcribing_then_returns_text_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Hello from Whisper"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = audio_file(&dir, 1024);

    let text = transcriber_for(&server)
        .transcribe(&audio, &ApiKey::new("sk-test"))
        .await
        .unwrap();

    assert_eq!(text, "Hello from Whisper");
}

#[tokio::test]
async fn given_audio_at_size_limit_when_transcribing_then_fails_without_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "unreachable"})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = audio_file(&dir, 25 * 1024 * 1024);

    let result = transcriber_for(&server)
        .transcribe(&audio, &ApiKey::new("sk-test"))
        .await;

    match result {
        Err(PipelineError::Transcription(msg)) => {
            assert!(msg.contains("exceeds the 25.0 MB limit"), "{}", msg)
        }
        other => panic!("expected transcription error, got {:?}", other),
    }
    server.verify().await;
}

#[tokio::test]
async fn given_rejected_key_when_transcribing_then_service_message_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = audio_file(&dir, 16);

    let err = transcriber_for(&server)
        .transcribe(&audio, &ApiKey::new("sk-wrong"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Transcription failed: status 401 Unauthorized: Incorrect API key provided"
    );
}

#[tokio::test]
async fn given_unexpected_body_when_transcribing_then_returns_transcription_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let audio = audio_file(&dir, 16);

    let result = transcriber_for(&server)
        .transcribe(&audio, &ApiKey::new("sk-test"))
        .await;

    assert!(matches!(result, Err(PipelineError::Transcription(_))));
}
