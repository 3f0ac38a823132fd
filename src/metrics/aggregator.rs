#![expect(
    clippy::float_arithmetic,
    reason = "Latency totals are accumulated in seconds"
)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::debug;

use super::{LatencySummary, Outcome, Report, StreamingHistogram};

/// Running totals over the outcome stream. Single writer, so no locking.
#[derive(Debug)]
pub struct Aggregator {
    avg_total: f64,
    fastest: f64,
    slowest: f64,
    size_total: u64,
    status_codes: BTreeMap<u16, u64>,
    errors: BTreeMap<String, u64>,
    histogram: StreamingHistogram,
}

impl Aggregator {
    #[must_use]
    pub fn new(histogram_bins: NonZeroUsize) -> Self {
        Self {
            avg_total: 0.0,
            fastest: 0.0,
            slowest: 0.0,
            size_total: 0,
            status_codes: BTreeMap::new(),
            errors: BTreeMap::new(),
            histogram: StreamingHistogram::new(histogram_bins),
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        if let Some(message) = outcome.error.as_ref() {
            let count = self.errors.entry(message.clone()).or_insert(0);
            *count = count.saturating_add(1);
            return;
        }

        let secs = outcome.duration.as_secs_f64();
        if self.histogram.count() == 0 {
            self.fastest = secs;
            self.slowest = secs;
        } else {
            self.fastest = self.fastest.min(secs);
            self.slowest = self.slowest.max(secs);
        }
        self.histogram.add(secs);
        self.avg_total += secs;

        let count = self.status_codes.entry(outcome.status_code).or_insert(0);
        *count = count.saturating_add(1);
        if outcome.content_length > 0 {
            self.size_total = self.size_total.saturating_add(outcome.content_length);
        }
    }

    #[must_use]
    pub fn finish(self, total: Duration) -> Report {
        Report {
            total,
            fastest: self.fastest,
            slowest: self.slowest,
            avg_total: self.avg_total,
            size_total: self.size_total,
            status_codes: self.status_codes,
            errors: self.errors,
            histogram: self.histogram,
        }
    }
}

impl Report {
    #[must_use]
    pub const fn success_count(&self) -> u64 {
        self.histogram.count()
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors
            .values()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }

    #[must_use]
    pub fn outcome_count(&self) -> u64 {
        self.success_count().saturating_add(self.error_count())
    }

    /// Throughput and latency averages. `None` for a run without a single
    /// successful request, where those figures are undefined.
    #[must_use]
    pub fn summary(&self) -> Option<LatencySummary> {
        let count = self.histogram.count();
        if count == 0 {
            return None;
        }
        let samples = count as f64;
        let elapsed = self.total.as_secs_f64();
        let requests_per_sec = if elapsed > 0.0 {
            samples / elapsed
        } else {
            0.0
        };
        Some(LatencySummary {
            total: self.total,
            slowest: self.slowest,
            fastest: self.fastest,
            average: self.avg_total / samples,
            requests_per_sec,
            size_total: self.size_total,
            size_per_request: self.size_total.checked_div(count).unwrap_or(0),
        })
    }
}

/// Spawns the task that drains the result channel into a [`Report`].
///
/// The task ends once every sender is dropped, i.e. after all workers exit.
/// When `tap` is set each outcome is also forwarded there; a full or closed
/// tap is skipped rather than slowing the drain.
#[must_use]
pub fn setup_aggregator(
    histogram_bins: NonZeroUsize,
    mut results_rx: mpsc::UnboundedReceiver<Outcome>,
    tap: Option<mpsc::Sender<Outcome>>,
    run_start: Instant,
) -> JoinHandle<Report> {
    tokio::spawn(async move {
        let mut aggregator = Aggregator::new(histogram_bins);
        while let Some(outcome) = results_rx.recv().await {
            aggregator.record(&outcome);
            if let Some(tap) = tap.as_ref()
                && let Err(err) = tap.try_send(outcome)
            {
                debug!("Outcome tap skipped an outcome: {}", err);
            }
        }
        let total = run_start.elapsed();
        debug!("Result channel drained after {:?}", total);
        aggregator.finish(total)
    })
}
