use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::RateLimit;

/// Shortest refill period. Faster rates hand out several tokens per tick.
const MIN_REFILL_INTERVAL: Duration = Duration::from_millis(1);

/// How many tokens each refill tick tops the bucket up to.
///
/// Rates slower than one token per [`MIN_REFILL_INTERVAL`] tick once per
/// token. Faster rates tick every millisecond and carry the fractional
/// remainder into the next tick, so the long-run rate is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RefillPlan {
    interval: Duration,
    tokens_num: u128,
    tokens_den: u128,
    remainder: u128,
}

impl RefillPlan {
    pub(super) fn new(limit: RateLimit) -> Self {
        let per_ns = limit.per().as_nanos().max(1);
        let requests = u128::from(limit.requests().get());
        let period_ns = per_ns.checked_div(requests).unwrap_or(per_ns);
        let min_ns = MIN_REFILL_INTERVAL.as_nanos();

        if period_ns >= min_ns {
            return Self {
                interval: duration_from_nanos(period_ns),
                tokens_num: 1,
                tokens_den: 1,
                remainder: 0,
            };
        }

        Self {
            interval: MIN_REFILL_INTERVAL,
            tokens_num: requests.saturating_mul(min_ns),
            tokens_den: per_ns,
            remainder: 0,
        }
    }

    pub(super) const fn interval(&self) -> Duration {
        self.interval
    }

    pub(super) fn next_tokens(&mut self) -> usize {
        let owed = self.tokens_num.saturating_add(self.remainder);
        let tokens = owed.checked_div(self.tokens_den).unwrap_or(0);
        self.remainder = owed.checked_rem(self.tokens_den).unwrap_or(0);
        usize::try_from(tokens).unwrap_or(usize::MAX)
    }
}

fn duration_from_nanos(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Token bucket fed by a background refill task.
///
/// The bucket never holds more than one refill's worth of tokens; unused
/// tokens are not banked, so a stalled consumer cannot burst afterwards.
/// Dropping the limiter stops the refill task.
pub(super) struct RateLimiter {
    permits: Arc<Semaphore>,
    refill_task: JoinHandle<()>,
}

impl RateLimiter {
    pub(super) fn spawn(limit: RateLimit) -> Self {
        let mut plan = RefillPlan::new(limit);
        let permits = Arc::new(Semaphore::new(0));
        let refill_permits = Arc::clone(&permits);
        debug!(
            "Rate limit {} per {:?}, refilling every {:?}",
            limit.requests(),
            limit.per(),
            plan.interval()
        );

        let refill_task = tokio::spawn(async move {
            refill_permits.add_permits(plan.next_tokens());
            let mut refill_tick = interval(plan.interval());
            refill_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the bucket was just filled.
            refill_tick.tick().await;
            loop {
                refill_tick.tick().await;
                let available = refill_permits.available_permits();
                let target = plan.next_tokens();
                if available < target {
                    refill_permits.add_permits(target.saturating_sub(available));
                }
            }
        });

        Self {
            permits,
            refill_task,
        }
    }

    /// Waits for one token and consumes it. Returns `false` if the bucket
    /// was closed.
    pub(super) async fn acquire(&self) -> bool {
        match self.permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill_task.abort();
    }
}
