use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use super::{Job, JobRunner};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full, try again later")]
    Full,

    #[error("Job queue is shut down")]
    Closed,
}

/// Producer side of the bounded job queue
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` jobs that are waiting for a worker
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueue without waiting; a full queue is reported instead of blocking the caller
    pub fn try_submit(&self, job: Job) -> Result<(), QueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Runs queued jobs with a fixed upper bound on concurrency
pub struct WorkerPool {
    dispatcher: JoinHandle<()>,
}

impl WorkerPool {
    pub fn start(runner: Arc<JobRunner>, receiver: mpsc::Receiver<Job>, concurrency: usize) -> Self {
        let dispatcher = tokio::spawn(dispatch(runner, receiver, concurrency.max(1)));
        Self { dispatcher }
    }

    /// Wait until every sender is gone and all in-flight jobs have finished
    pub async fn shutdown(self) {
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "Job dispatcher terminated abnormally");
        }
    }
}

async fn dispatch(runner: Arc<JobRunner>, mut receiver: mpsc::Receiver<Job>, concurrency: usize) {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut running = JoinSet::new();
    tracing::info!(concurrency, "Worker pool started");

    loop {
        tokio::select! {
            Some(result) = running.join_next(), if !running.is_empty() => log_finished(result),
            next = receiver.recv() => {
                let Some(job) = next else { break };

                // Waiting here leaves further jobs in the channel, which is
                // what makes the queue bound apply.
                let Ok(permit) = permits.clone().acquire_owned().await else { break };
                let runner = Arc::clone(&runner);
                running.spawn(async move {
                    let _permit = permit;
                    runner.run(job).await;
                });
            }
        }
    }

    while let Some(result) = running.join_next().await {
        log_finished(result);
    }
    tracing::info!("Worker pool stopped: queue closed");
}

fn log_finished(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Job task panicked");
        } else {
            tracing::warn!(error = %e, "Job task cancelled");
        }
    }
}
