use super::rate::RefillPlan;
use super::*;
use crate::error::{AppError, AppResult, TransportError};
use crate::http::{Job, TransportResponse};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

/// Timeout reported by failing fake requests.
const FAILURE_TIMEOUT: Duration = Duration::from_millis(7);

#[derive(Debug, Clone)]
struct SeenRequest {
    at: Instant,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

#[derive(Default)]
struct FakeTransport {
    delay: Duration,
    fail_every: Option<u64>,
    calls: AtomicU64,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakeTransport {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing_every(every: u64) -> Self {
        Self {
            fail_every: Some(every),
            ..Self::default()
        }
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn seen(&self) -> AppResult<Vec<SeenRequest>> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .map_err(|_| AppError::validation("seen requests lock poisoned"))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: Job,
        timeout: Option<Duration>,
    ) -> Result<TransportResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let seen = SeenRequest {
            at: Instant::now(),
            method: request.method().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map(<[u8]>::to_vec),
            timeout,
        };
        if let Ok(mut seen_requests) = self.seen.lock() {
            seen_requests.push(seen);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self
            .fail_every
            .is_some_and(|every| call.checked_rem(every) == Some(0))
        {
            return Err(TransportError::Timeout {
                timeout: FAILURE_TIMEOUT,
            });
        }
        Ok(TransportResponse {
            status: 200,
            content_length: 2,
        })
    }
}

#[derive(Default)]
struct CountingProgress {
    increments: AtomicU64,
    finishes: AtomicU64,
}

impl ProgressSink for CountingProgress {
    fn increment(&self) {
        self.increments.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
    }
}

fn run_settings(mode: RunMode, concurrency: usize) -> AppResult<RunSettings> {
    let concurrency = NonZeroUsize::new(concurrency)
        .ok_or_else(|| AppError::validation("concurrency must be non-zero"))?;
    Ok(RunSettings::new(mode, concurrency))
}

fn get_template() -> AppResult<RequestTemplate> {
    Ok(RequestTemplate::builder(Method::GET, "http://127.0.0.1:9/")?.build())
}

#[test]
fn count_mode_runs_every_job() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let engine = Engine::new(
            run_settings(RunMode::Count(20), 2)?,
            get_template()?,
            transport.clone(),
        );
        let report = engine.run().await?;

        if report.success_count() != 20 || report.error_count() != 0 {
            return Err(AppError::validation(format!(
                "Unexpected counts: {} ok, {} errors",
                report.success_count(),
                report.error_count()
            )));
        }
        if report.status_codes.get(&200) != Some(&20) || report.status_codes.len() != 1 {
            return Err(AppError::validation(format!(
                "Unexpected status codes: {:?}",
                report.status_codes
            )));
        }
        if report.size_total != 40 {
            return Err(AppError::validation(format!(
                "Unexpected size total: {}",
                report.size_total
            )));
        }
        if transport.calls() != 20 {
            return Err(AppError::validation(format!(
                "Unexpected transport calls: {}",
                transport.calls()
            )));
        }
        Ok(())
    })
}

#[test]
fn zero_count_dispatches_nothing() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let engine = Engine::new(
            run_settings(RunMode::Count(0), 4)?,
            get_template()?,
            transport.clone(),
        );
        let report = engine.run().await?;
        if report.outcome_count() != 0 || transport.calls() != 0 {
            return Err(AppError::validation("Expected no jobs"));
        }
        if report.summary().is_some() {
            return Err(AppError::validation("Expected no summary without samples"));
        }
        Ok(())
    })
}

#[test]
fn failures_are_recorded_by_message() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::failing_every(3));
        let engine = Engine::new(
            run_settings(RunMode::Count(30), 4)?,
            get_template()?,
            transport.clone(),
        );
        let report = engine.run().await?;

        if report.errors.get("request timed out after 7ms") != Some(&10) {
            return Err(AppError::validation(format!(
                "Unexpected errors: {:?}",
                report.errors
            )));
        }
        if report.success_count() != 20 || report.outcome_count() != transport.calls() {
            return Err(AppError::validation(format!(
                "Unexpected counts: {} ok, {} total, {} calls",
                report.success_count(),
                report.outcome_count(),
                transport.calls()
            )));
        }
        if report.status_codes.contains_key(&0) {
            return Err(AppError::validation("Failures must not count as a status"));
        }
        Ok(())
    })
}

#[test]
fn stop_before_run_yields_empty_report() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let engine = Engine::new(
            run_settings(RunMode::Count(100), 4)?,
            get_template()?,
            transport.clone(),
        );
        if !engine.stop_handle().stop() {
            return Err(AppError::validation("First stop should take effect"));
        }
        let report = engine.run().await?;
        if report.outcome_count() != 0 || transport.calls() != 0 {
            return Err(AppError::validation(format!(
                "Expected zero samples, got {}",
                report.outcome_count()
            )));
        }
        Ok(())
    })
}

#[test]
fn stop_is_idempotent() -> AppResult<()> {
    let stop = StopHandle::new();
    if !stop.stop() {
        return Err(AppError::validation("First stop should report true"));
    }
    if stop.stop() || stop.clone().stop() {
        return Err(AppError::validation("Later stops should report false"));
    }
    if !stop.is_stopped() {
        return Err(AppError::validation("Expected stopped flag"));
    }
    Ok(())
}

#[test]
fn stop_during_run_reports_completed_jobs() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::with_delay(Duration::from_millis(20)));
        let engine = Engine::new(
            run_settings(RunMode::Count(10_000), 4)?,
            get_template()?,
            transport.clone(),
        );
        let stop = engine.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            stop.stop();
        });

        let report = engine.run().await?;
        if report.outcome_count() != transport.calls() {
            return Err(AppError::validation(format!(
                "Outcomes ({}) must match executed jobs ({})",
                report.outcome_count(),
                transport.calls()
            )));
        }
        if report.outcome_count() == 0 || report.outcome_count() >= 10_000 {
            return Err(AppError::validation(format!(
                "Expected a partial run, got {}",
                report.outcome_count()
            )));
        }
        Ok(())
    })
}

#[test]
fn duration_mode_stops_after_deadline() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::with_delay(Duration::from_millis(5)));
        let engine = Engine::new(
            run_settings(RunMode::Duration(Duration::from_millis(200)), 2)?,
            get_template()?,
            transport.clone(),
        );
        let started = Instant::now();
        let report = engine.run().await?;
        let elapsed = started.elapsed();

        if elapsed < Duration::from_millis(200) || elapsed > Duration::from_secs(2) {
            return Err(AppError::validation(format!(
                "Unexpected run length: {:?}",
                elapsed
            )));
        }
        if report.outcome_count() == 0 || report.outcome_count() != transport.calls() {
            return Err(AppError::validation(format!(
                "Unexpected outcome count: {}",
                report.outcome_count()
            )));
        }
        if !engine.stop_handle().is_stopped() {
            return Err(AppError::validation("Deadline should stop the run"));
        }
        Ok(())
    })
}

#[test]
fn rate_limit_spaces_dispatches() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let mut settings = run_settings(RunMode::Count(5), 5)?;
        settings.rate = Some(RateLimit::new(20, Duration::from_secs(1))?);
        let engine = Engine::new(settings, get_template()?, transport.clone());

        let started = Instant::now();
        let report = engine.run().await?;
        let elapsed = started.elapsed();
        if report.success_count() != 5 {
            return Err(AppError::validation(format!(
                "Unexpected success count: {}",
                report.success_count()
            )));
        }
        if elapsed < Duration::from_millis(180) {
            return Err(AppError::validation(format!(
                "Five jobs at 20/s finished too fast: {:?}",
                elapsed
            )));
        }
        Ok(())
    })
}

#[test]
fn slow_rate_limits_completions() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let mut settings = run_settings(RunMode::Count(20), 2)?;
        settings.rate = Some(RateLimit::per_second(1)?);
        let engine = Engine::new(settings, get_template()?, transport.clone());

        let stop = engine.stop_handle();
        let observer = Arc::clone(&transport);
        let checker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let calls = observer.calls();
            stop.stop();
            calls
        });

        let report = engine.run().await?;
        let calls_after_one_second = checker.await?;
        if calls_after_one_second > 2 {
            return Err(AppError::validation(format!(
                "Expected at most 2 requests after 1s, got {}",
                calls_after_one_second
            )));
        }
        if report.outcome_count() > 3 || report.outcome_count() != transport.calls() {
            return Err(AppError::validation(format!(
                "Unexpected outcome count: {}",
                report.outcome_count()
            )));
        }
        Ok(())
    })
}

#[test]
fn rate_window_never_exceeds_limit() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let mut settings = run_settings(RunMode::Duration(Duration::from_millis(1500)), 4)?;
        settings.rate = Some(RateLimit::per_second(10)?);
        let engine = Engine::new(settings, get_template()?, transport.clone());
        engine.run().await?;

        let mut starts: Vec<Instant> = transport.seen()?.iter().map(|seen| seen.at).collect();
        starts.sort();
        for (index, start) in starts.iter().enumerate() {
            let window_end = start
                .checked_add(Duration::from_secs(1))
                .ok_or_else(|| AppError::validation("instant overflow"))?;
            let in_window = starts
                .iter()
                .skip(index)
                .take_while(|at| **at < window_end)
                .count();
            if in_window > 11 {
                return Err(AppError::validation(format!(
                    "{} requests started within one second",
                    in_window
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn template_is_reproduced_for_every_job() -> AppResult<()> {
    run_async_test(async {
        let template = RequestTemplate::builder(Method::POST, "http://127.0.0.1:9/submit")?
            .header("X-Some", "value")?
            .basic_auth("username", "password")?
            .body("Body")
            .build();
        let transport = Arc::new(FakeTransport::default());
        let engine = Engine::new(
            run_settings(RunMode::Count(10), 3)?,
            template,
            transport.clone(),
        );
        engine.run().await?;

        let seen = transport.seen()?;
        if seen.len() != 10 {
            return Err(AppError::validation(format!(
                "Unexpected request count: {}",
                seen.len()
            )));
        }
        for request in seen {
            if request.method != Method::POST {
                return Err(AppError::validation(format!(
                    "Unexpected method: {}",
                    request.method
                )));
            }
            let header = |name: &str| {
                request
                    .headers
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned)
            };
            if header("x-some").as_deref() != Some("value") {
                return Err(AppError::validation("Missing custom header"));
            }
            if header("authorization").as_deref() != Some("Basic dXNlcm5hbWU6cGFzc3dvcmQ=") {
                return Err(AppError::validation("Missing basic auth header"));
            }
            if request.body.as_deref() != Some(b"Body".as_slice()) {
                return Err(AppError::validation(format!(
                    "Unexpected body: {:?}",
                    request.body
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn timeout_is_passed_to_transport() -> AppResult<()> {
    run_async_test(async {
        let transport = Arc::new(FakeTransport::default());
        let mut engine = Engine::new(
            run_settings(RunMode::Count(4), 2)?,
            get_template()?,
            transport.clone(),
        );
        engine.set_timeout(Some(Duration::from_millis(250)))?;
        engine.run().await?;

        let seen = transport.seen()?;
        if seen.is_empty()
            || seen
                .iter()
                .any(|request| request.timeout != Some(Duration::from_millis(250)))
        {
            return Err(AppError::validation("Expected timeout on every request"));
        }
        Ok(())
    })
}

#[test]
fn progress_sink_counts_every_outcome() -> AppResult<()> {
    run_async_test(async {
        let progress = Arc::new(CountingProgress::default());
        let mut engine = Engine::new(
            run_settings(RunMode::Count(20), 3)?,
            get_template()?,
            Arc::new(FakeTransport::failing_every(4)),
        );
        engine.set_progress(progress.clone())?;
        let report = engine.run().await?;

        let increments = progress.increments.load(Ordering::SeqCst);
        if increments != report.outcome_count() || increments != 20 {
            return Err(AppError::validation(format!(
                "Unexpected progress increments: {}",
                increments
            )));
        }
        if progress.finishes.load(Ordering::SeqCst) != 1 {
            return Err(AppError::validation("Expected exactly one finish"));
        }
        Ok(())
    })
}

#[test]
fn outcome_tap_sees_every_outcome() -> AppResult<()> {
    run_async_test(async {
        let (tap_tx, mut tap_rx) = mpsc::channel(64);
        let mut engine = Engine::new(
            run_settings(RunMode::Count(10), 2)?,
            get_template()?,
            Arc::new(FakeTransport::default()),
        );
        engine.set_outcome_tap(tap_tx)?;
        engine.run().await?;
        drop(engine);

        let mut received = 0u32;
        while let Some(outcome) = tap_rx.recv().await {
            if outcome.status_code != 200 {
                return Err(AppError::validation(format!(
                    "Unexpected tapped outcome: {:?}",
                    outcome
                )));
            }
            received = received.saturating_add(1);
        }
        if received != 10 {
            return Err(AppError::validation(format!(
                "Expected 10 tapped outcomes, got {}",
                received
            )));
        }
        Ok(())
    })
}

#[test]
fn configuration_is_frozen_once_started() -> AppResult<()> {
    run_async_test(async {
        let mut engine = Engine::new(
            run_settings(RunMode::Count(2), 1)?,
            get_template()?,
            Arc::new(FakeTransport::default()),
        );
        engine.set_mode(RunMode::Count(3))?;
        engine.set_rate_limit(None)?;
        let report = engine.run().await?;
        if report.success_count() != 3 {
            return Err(AppError::validation("Mode change before run should apply"));
        }

        let concurrency = NonZeroUsize::new(2)
            .ok_or_else(|| AppError::validation("concurrency must be non-zero"))?;
        let attempts = [
            engine.set_mode(RunMode::Count(5)),
            engine.set_concurrency(concurrency),
            engine.set_rate_limit(None),
            engine.set_timeout(None),
        ];
        for attempt in attempts {
            match attempt {
                Err(AppError::Engine(EngineError::InvalidState { .. })) => {}
                other => {
                    return Err(AppError::validation(format!(
                        "Expected InvalidState, got {:?}",
                        other
                    )));
                }
            }
        }

        match engine.run().await {
            Err(AppError::Engine(EngineError::InvalidState { .. })) => Ok(()),
            Err(other) => Err(other),
            Ok(_) => Err(AppError::validation("Second run should fail")),
        }
    })
}

#[test]
fn refill_plan_for_slow_rates_ticks_once_per_token() -> AppResult<()> {
    let mut plan = RefillPlan::new(RateLimit::per_second(1)?);
    if plan.interval() != Duration::from_secs(1) {
        return Err(AppError::validation(format!(
            "Unexpected interval: {:?}",
            plan.interval()
        )));
    }
    if (0..5).map(|_| plan.next_tokens()).any(|tokens| tokens != 1) {
        return Err(AppError::validation("Expected one token per tick"));
    }

    let plan = RefillPlan::new(RateLimit::new(3, Duration::from_secs(1))?);
    if plan.interval() != Duration::from_nanos(333_333_333) {
        return Err(AppError::validation(format!(
            "Unexpected interval: {:?}",
            plan.interval()
        )));
    }
    Ok(())
}

#[test]
fn refill_plan_for_fast_rates_carries_remainder() -> AppResult<()> {
    let mut plan = RefillPlan::new(RateLimit::per_second(5000)?);
    if plan.interval() != Duration::from_millis(1) {
        return Err(AppError::validation(format!(
            "Unexpected interval: {:?}",
            plan.interval()
        )));
    }
    if (0..10).map(|_| plan.next_tokens()).any(|tokens| tokens != 5) {
        return Err(AppError::validation("Expected five tokens per tick"));
    }

    let mut plan = RefillPlan::new(RateLimit::per_second(1500)?);
    let ticks: Vec<usize> = (0..1000).map(|_| plan.next_tokens()).collect();
    if ticks.iter().any(|tokens| !(1..=2).contains(tokens)) {
        return Err(AppError::validation("Expected one or two tokens per tick"));
    }
    if ticks.iter().sum::<usize>() != 1500 {
        return Err(AppError::validation(format!(
            "Expected 1500 tokens per second, got {}",
            ticks.iter().sum::<usize>()
        )));
    }
    Ok(())
}

#[test]
fn rate_limit_rejects_zero_values() -> AppResult<()> {
    if RateLimit::new(0, Duration::from_secs(1)).is_ok() {
        return Err(AppError::validation("Expected Err for zero requests"));
    }
    if RateLimit::new(10, Duration::ZERO).is_ok() {
        return Err(AppError::validation("Expected Err for zero period"));
    }
    Ok(())
}
