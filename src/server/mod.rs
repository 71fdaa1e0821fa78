//! HTTP trigger: validates requests and hands jobs to the worker pool.

use anyhow::Context;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::job::{JobQueue, JobRunner, WorkerPool};

pub mod handlers;
pub mod request_id;

pub use handlers::{health_handler, process_video_handler};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
}

pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/", get(health_handler))
        .route("/process-video", post(process_video_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .with_state(state)
}

/// Run the service until Ctrl-C, then let in-flight jobs finish
pub async fn serve(config: Config) -> crate::Result<()> {
    let runner = Arc::new(JobRunner::from_config(&config)?);
    let (queue, receiver) = JobQueue::bounded(config.workers.queue_capacity);
    let pool = WorkerPool::start(runner, receiver, config.workers.concurrency);

    let router = create_router(AppState { queue });

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shutting down, waiting for in-flight jobs");
    pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
