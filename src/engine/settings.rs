use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use crate::error::ValidationError;

/// Default number of centroids kept by the latency histogram.
pub const DEFAULT_HISTOGRAM_BINS: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(bins) => bins,
    None => NonZeroUsize::MIN,
};

/// Which limit ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Dispatch this many jobs. Zero dispatches nothing.
    Count(u64),
    /// Dispatch until the duration elapses.
    Duration(Duration),
}

/// `requests` jobs per `per` of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    requests: NonZeroU64,
    per: Duration,
}

impl RateLimit {
    /// # Errors
    ///
    /// Returns an error when `requests` is zero or `per` is zero.
    pub fn new(requests: u64, per: Duration) -> Result<Self, ValidationError> {
        let requests = NonZeroU64::new(requests).ok_or(ValidationError::ValueTooSmall { min: 1 })?;
        if per.is_zero() {
            return Err(ValidationError::RatePeriodZero);
        }
        Ok(Self { requests, per })
    }

    /// # Errors
    ///
    /// Returns an error when `requests` is zero.
    pub fn per_second(requests: u64) -> Result<Self, ValidationError> {
        Self::new(requests, Duration::from_secs(1))
    }

    #[must_use]
    pub const fn requests(self) -> NonZeroU64 {
        self.requests
    }

    #[must_use]
    pub const fn per(self) -> Duration {
        self.per
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub mode: RunMode,
    pub concurrency: NonZeroUsize,
    pub rate: Option<RateLimit>,
    pub timeout: Option<Duration>,
    pub histogram_bins: NonZeroUsize,
}

impl RunSettings {
    #[must_use]
    pub const fn new(mode: RunMode, concurrency: NonZeroUsize) -> Self {
        Self {
            mode,
            concurrency,
            rate: None,
            timeout: None,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}
