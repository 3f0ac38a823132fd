use std::collections::BTreeMap;
use std::time::Duration;

use super::histogram::StreamingHistogram;

/// The recorded result of executing one job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status_code: u16,
    pub duration: Duration,
    pub error: Option<String>,
    pub content_length: u64,
}

impl Outcome {
    #[must_use]
    pub const fn success(status_code: u16, duration: Duration, content_length: u64) -> Self {
        Self {
            status_code,
            duration,
            error: None,
            content_length,
        }
    }

    /// Failed attempts carry status `0` and no content length.
    #[must_use]
    pub fn failure(duration: Duration, error: &dyn std::error::Error) -> Self {
        Self {
            status_code: 0,
            duration,
            error: Some(error.to_string()),
            content_length: 0,
        }
    }
}

/// Final statistics of a run, built once the outcome stream is drained.
#[derive(Debug, Clone)]
pub struct Report {
    pub total: Duration,
    pub fastest: f64,
    pub slowest: f64,
    pub avg_total: f64,
    pub size_total: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub errors: BTreeMap<String, u64>,
    pub histogram: StreamingHistogram,
}

/// Derived latency figures; only defined when at least one request succeeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub total: Duration,
    pub slowest: f64,
    pub fastest: f64,
    pub average: f64,
    pub requests_per_sec: f64,
    pub size_total: u64,
    pub size_per_request: u64,
}
