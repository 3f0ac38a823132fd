use tracing::debug;

use crate::http::{Job, RequestTemplate};
use crate::shutdown::{ShutdownReceiver, wait_for_shutdown};

use super::RunMode;
use super::rate::RateLimiter;

/// Feeds jobs into the bounded queue until the count is reached or the run
/// is cancelled.
///
/// Each iteration waits for a rate token (if limited), re-checks
/// cancellation, then blocks on queue capacity. Both waits give way to
/// cancellation, so a stop request never leaves the dispatcher stuck behind
/// a full queue or an empty bucket. Dropping the dispatcher closes the queue.
pub(super) struct Dispatcher<'run> {
    pub(super) mode: RunMode,
    pub(super) template: &'run RequestTemplate,
    pub(super) rate_limiter: Option<RateLimiter>,
    pub(super) jobs_tx: flume::Sender<Job>,
    pub(super) shutdown_rx: ShutdownReceiver,
}

impl Dispatcher<'_> {
    /// Returns the number of jobs handed to workers.
    pub(super) async fn run(mut self) -> u64 {
        let limit = match self.mode {
            RunMode::Count(count) => Some(count),
            RunMode::Duration(_) => None,
        };
        let mut dispatched: u64 = 0;

        loop {
            if limit.is_some_and(|limit| dispatched >= limit) {
                debug!("Dispatched all {} jobs", dispatched);
                break;
            }

            if let Some(limiter) = self.rate_limiter.as_ref() {
                let acquired = tokio::select! {
                    biased;
                    () = wait_for_shutdown(&mut self.shutdown_rx) => false,
                    acquired = limiter.acquire() => acquired,
                };
                if !acquired {
                    break;
                }
            }

            if *self.shutdown_rx.borrow() {
                break;
            }

            let job = self.template.job();
            let sent = tokio::select! {
                biased;
                () = wait_for_shutdown(&mut self.shutdown_rx) => false,
                sent = self.jobs_tx.send_async(job) => sent.is_ok(),
            };
            if !sent {
                break;
            }
            dispatched = dispatched.saturating_add(1);
        }

        if *self.shutdown_rx.borrow() {
            debug!("Dispatch cancelled after {} jobs", dispatched);
        }
        dispatched
    }
}
