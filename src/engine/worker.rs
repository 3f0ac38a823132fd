use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::EngineError;
use crate::http::{Job, Transport};
use crate::metrics::Outcome;

use super::ProgressSink;

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub(super) struct WorkerContext {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) timeout: Option<Duration>,
    pub(super) results_tx: mpsc::UnboundedSender<Outcome>,
    pub(super) progress: Option<Arc<dyn ProgressSink>>,
}

pub(super) struct WorkerPool {
    handles: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Spawns `concurrency` workers pulling from `jobs_rx`. Each exits once
    /// the queue is closed and drained.
    pub(super) fn spawn(
        concurrency: NonZeroUsize,
        jobs_rx: &flume::Receiver<Job>,
        context: &WorkerContext,
    ) -> Self {
        let handles = (0..concurrency.get())
            .map(|_| {
                let jobs_rx = jobs_rx.clone();
                let context = context.clone();
                tokio::spawn(run_worker(jobs_rx, context))
            })
            .collect();
        Self { handles }
    }

    /// Waits for every worker and returns how many jobs they completed.
    ///
    /// All workers are awaited even when one of them failed; the first
    /// failure is returned.
    pub(super) async fn join(self) -> Result<u64, EngineError> {
        let mut completed: u64 = 0;
        let mut first_failure = None;
        for handle in self.handles {
            match handle.await {
                Ok(count) => completed = completed.saturating_add(count),
                Err(err) => {
                    error!("Worker task failed: {}", err);
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }
        match first_failure {
            Some(source) => Err(EngineError::WorkerFailed { source }),
            None => Ok(completed),
        }
    }
}

async fn run_worker(jobs_rx: flume::Receiver<Job>, context: WorkerContext) -> u64 {
    let mut completed: u64 = 0;
    while let Ok(job) = jobs_rx.recv_async().await {
        let started = Instant::now();
        let outcome = match context.transport.execute(job, context.timeout).await {
            Ok(response) => {
                Outcome::success(response.status, started.elapsed(), response.content_length)
            }
            Err(err) => {
                debug!("Request failed: {}", err);
                Outcome::failure(started.elapsed(), &err)
            }
        };

        if let Some(progress) = context.progress.as_ref() {
            progress.increment();
        }
        if context.results_tx.send(outcome).is_err() {
            error!("Result channel closed; worker exiting early");
            break;
        }
        completed = completed.saturating_add(1);
    }
    completed
}
