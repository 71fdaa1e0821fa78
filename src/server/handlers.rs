use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use super::AppState;
use crate::job::{ApiKey, Job};

/// Fields `POST /process-video` requires, in the order they are checked
pub const REQUIRED_FIELDS: [&str; 4] = [
    "google_drive_url",
    "callback_url",
    "row_id",
    "openai_api_key",
];

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ProcessingResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub row_id: Value,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            service: "video-transcription",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

#[tracing::instrument(skip(state, body))]
pub async fn process_video_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let data: Value = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable request body");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid JSON body: {}", e),
            );
        }
    };

    // Arrays and strings carry no fields, so they fail the missing-field check.
    let no_fields = Map::new();
    let fields = match &data {
        Value::Object(fields) => fields,
        Value::Array(_) | Value::String(_) => &no_fields,
        _ => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request body must be a JSON object",
            );
        }
    };

    if let Some(missing) = REQUIRED_FIELDS.iter().find(|field| !fields.contains_key(**field)) {
        tracing::warn!(field = %missing, "Rejected request with missing field");
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Missing required field: {}", missing),
        );
    }

    let (google_drive_url, callback_url, api_key) = match (
        string_field(fields, "google_drive_url"),
        string_field(fields, "callback_url"),
        string_field(fields, "openai_api_key"),
    ) {
        (Ok(url), Ok(callback), Ok(key)) => (url, callback, key),
        (Err(response), _, _) | (_, Err(response), _) | (_, _, Err(response)) => return response,
    };
    let row_id = fields["row_id"].clone();

    let job = Job::new(google_drive_url, callback_url, row_id.clone(), ApiKey::new(api_key));
    let job_id = job.id;

    if let Err(e) = state.queue.try_submit(job) {
        tracing::warn!(error = %e, row_id = %row_id, "Could not enqueue job");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
    }

    tracing::info!(job_id = %job_id, row_id = %row_id, "Video processing started");

    (
        StatusCode::OK,
        Json(ProcessingResponse {
            status: "processing",
            message: "Video processing started",
            row_id,
        }),
    )
        .into_response()
}

fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a str, Response> {
    fields[name].as_str().ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Field must be a string: {}", name),
        )
    })
}
