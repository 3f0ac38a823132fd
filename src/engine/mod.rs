//! The load engine: a dispatcher feeding a bounded job queue, a fixed pool
//! of workers draining it, and an aggregator folding their outcomes into a
//! [`Report`].
//!
//! ```text
//! dispatcher --(bounded queue)--> workers --(results)--> aggregator
//!      ^                                                     |
//!  rate limiter                                      optional outcome tap
//! ```
//!
//! A run ends when the dispatcher stops (count reached, deadline elapsed or
//! [`StopHandle::stop`] called). The queue is then closed, the workers
//! finish what they already took, and the report reflects exactly the jobs
//! that were executed.
mod dispatcher;
mod progress;
mod rate;
mod settings;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, EngineError};
use crate::http::{RequestTemplate, Transport};
use crate::metrics::{Outcome, Report, setup_aggregator};
use crate::shutdown::{StopHandle, wait_for_shutdown};

use dispatcher::Dispatcher;
use rate::RateLimiter;
use worker::{WorkerContext, WorkerPool};

pub use progress::ProgressSink;
pub use settings::{DEFAULT_HISTOGRAM_BINS, RateLimit, RunMode, RunSettings};

pub struct Engine {
    settings: RunSettings,
    template: RequestTemplate,
    transport: Arc<dyn Transport>,
    progress: Option<Arc<dyn ProgressSink>>,
    outcome_tap: Option<mpsc::Sender<Outcome>>,
    stop: StopHandle,
    started: AtomicBool,
}

impl Engine {
    #[must_use]
    pub fn new(
        settings: RunSettings,
        template: RequestTemplate,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            settings,
            template,
            transport,
            progress: None,
            outcome_tap: None,
            stop: StopHandle::new(),
            started: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// A handle that cancels this engine's run. Valid before, during and
    /// after the run.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_mode(&mut self, mode: RunMode) -> AppResult<()> {
        self.ensure_configurable("change the run mode")?;
        self.settings.mode = mode;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_concurrency(&mut self, concurrency: std::num::NonZeroUsize) -> AppResult<()> {
        self.ensure_configurable("change the concurrency")?;
        self.settings.concurrency = concurrency;
        Ok(())
    }

    /// `None` removes the limit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_rate_limit(&mut self, rate: Option<RateLimit>) -> AppResult<()> {
        self.ensure_configurable("change the rate limit")?;
        self.settings.rate = rate;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> AppResult<()> {
        self.ensure_configurable("change the request timeout")?;
        self.settings.timeout = timeout;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_progress(&mut self, progress: Arc<dyn ProgressSink>) -> AppResult<()> {
        self.ensure_configurable("attach a progress sink")?;
        self.progress = Some(progress);
        Ok(())
    }

    /// Mirrors every outcome to `tap` as it is aggregated. Outcomes that do
    /// not fit in the tap are dropped from the tap only.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] once the run has started.
    pub fn set_outcome_tap(&mut self, tap: mpsc::Sender<Outcome>) -> AppResult<()> {
        self.ensure_configurable("attach an outcome tap")?;
        self.outcome_tap = Some(tap);
        Ok(())
    }

    /// Executes the run and returns its report. May be called once.
    ///
    /// Cancelling through [`Engine::stop_handle`] still yields a report of
    /// the jobs that completed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] on a second call, or an error
    /// when a worker or the aggregator task fails.
    pub async fn run(&self) -> AppResult<Report> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(AppError::engine(EngineError::InvalidState {
                operation: "run the engine",
            }));
        }

        let settings = self.settings;
        info!(
            "Starting run: {:?}, concurrency {}, rate {:?}, timeout {:?}",
            settings.mode, settings.concurrency, settings.rate, settings.timeout
        );

        let run_start = Instant::now();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let aggregator = setup_aggregator(
            settings.histogram_bins,
            results_rx,
            self.outcome_tap.clone(),
            run_start,
        );

        let (jobs_tx, jobs_rx) = flume::bounded(settings.concurrency.get());
        let workers = WorkerPool::spawn(
            settings.concurrency,
            &jobs_rx,
            &WorkerContext {
                transport: Arc::clone(&self.transport),
                timeout: settings.timeout,
                results_tx,
                progress: self.progress.clone(),
            },
        );
        drop(jobs_rx);

        let deadline = match settings.mode {
            RunMode::Duration(duration) => Some(spawn_deadline(duration, self.stop.clone())),
            RunMode::Count(_) => None,
        };

        let dispatcher = Dispatcher {
            mode: settings.mode,
            template: &self.template,
            rate_limiter: settings.rate.map(RateLimiter::spawn),
            jobs_tx,
            shutdown_rx: self.stop.subscribe(),
        };
        let dispatched = dispatcher.run().await;

        let joined = workers.join().await;
        if let Some(deadline) = deadline {
            deadline.abort();
        }
        if let Some(progress) = self.progress.as_ref() {
            progress.finish();
        }

        let report = aggregator
            .await
            .map_err(|err| AppError::engine(EngineError::AggregatorFailed { source: err }))?;
        let completed = joined?;
        info!(
            "Run finished: {} dispatched, {} completed in {:?}",
            dispatched, completed, report.total
        );
        Ok(report)
    }

    fn ensure_configurable(&self, operation: &'static str) -> AppResult<()> {
        if self.started.load(Ordering::Acquire) {
            return Err(AppError::engine(EngineError::InvalidState { operation }));
        }
        Ok(())
    }
}

/// Stops the run once `duration` has elapsed, unless it was stopped first.
fn spawn_deadline(duration: Duration, stop: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown_rx = stop.subscribe();
        tokio::select! {
            () = wait_for_shutdown(&mut shutdown_rx) => {}
            () = tokio::time::sleep(duration) => {
                if stop.stop() {
                    debug!("Run duration of {:?} elapsed", duration);
                }
            }
        }
    })
}
