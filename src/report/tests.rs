use super::*;
use crate::error::{AppError, AppResult, TransportError};
use crate::metrics::{Aggregator, Outcome};
use std::num::NonZeroUsize;
use std::time::Duration;

fn aggregate(outcomes: &[Outcome], total: Duration) -> AppResult<Report> {
    let bins = NonZeroUsize::new(10).ok_or_else(|| AppError::validation("bins"))?;
    let mut aggregator = Aggregator::new(bins);
    for outcome in outcomes {
        aggregator.record(outcome);
    }
    Ok(aggregator.finish(total))
}

fn render_to_string(report: &Report, format: OutputFormat) -> AppResult<String> {
    let mut out = Vec::new();
    render(report, format, &mut out)?;
    String::from_utf8(out).map_err(|err| AppError::validation(err.to_string()))
}

fn timeout_error() -> TransportError {
    TransportError::Timeout {
        timeout: Duration::from_millis(100),
    }
}

#[test]
fn text_report_has_every_section() -> AppResult<()> {
    let outcomes = [
        Outcome::success(200, Duration::from_millis(100), 10),
        Outcome::success(200, Duration::from_millis(200), 10),
        Outcome::success(404, Duration::from_millis(300), 0),
        Outcome::failure(Duration::from_millis(100), &timeout_error()),
    ];
    let report = aggregate(&outcomes, Duration::from_secs(2))?;
    let text = render_to_string(&report, OutputFormat::Text)?;

    let expected = [
        "\nSummary:\n",
        "  Total:\t2.0000 secs.\n",
        "  Slowest:\t0.3000 secs.\n",
        "  Fastest:\t0.1000 secs.\n",
        "  Average:\t0.2000 secs.\n",
        "  Requests/sec:\t1.5000\n",
        "  Total Data Received:\t20 bytes.\n",
        "  Response Size per Request:\t6 bytes.\n",
        "\nStatus code distribution:\n  [200]\t2 responses\n  [404]\t1 responses\n",
        "\nResponse time histogram:\n",
        "  0.100 [1]\t|∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎∎\n",
        "\nLatency distribution:\n",
        "  50% in 0.2000 secs.\n",
        "\nError distribution:\n  [1]\trequest timed out after 100ms\n",
    ];
    for fragment in expected {
        if !text.contains(fragment) {
            return Err(AppError::validation(format!(
                "Missing {:?} in:\n{}",
                fragment, text
            )));
        }
    }
    Ok(())
}

#[test]
fn histogram_bars_scale_to_largest_bin() -> AppResult<()> {
    let mut outcomes = Vec::new();
    for _ in 0..4 {
        outcomes.push(Outcome::success(200, Duration::from_millis(100), 0));
    }
    outcomes.push(Outcome::success(200, Duration::from_millis(500), 0));
    let report = aggregate(&outcomes, Duration::from_secs(1))?;
    let text = render_to_string(&report, OutputFormat::Text)?;

    let full = "∎".repeat(40);
    let quarter = "∎".repeat(10);
    if !text.contains(&format!("  0.100 [4]\t|{}\n", full)) {
        return Err(AppError::validation(format!("Missing full bar in:\n{}", text)));
    }
    if !text.contains(&format!("  0.500 [1]\t|{}\n", quarter)) {
        return Err(AppError::validation(format!("Missing quarter bar in:\n{}", text)));
    }
    if text.contains("Total Data Received") {
        return Err(AppError::validation("Size lines need received bytes"));
    }
    Ok(())
}

#[test]
fn error_only_report_prints_errors() -> AppResult<()> {
    let outcomes = [
        Outcome::failure(Duration::from_millis(5), &timeout_error()),
        Outcome::failure(Duration::from_millis(5), &timeout_error()),
    ];
    let report = aggregate(&outcomes, Duration::from_secs(1))?;
    let text = render_to_string(&report, OutputFormat::Text)?;

    if text.contains("Summary:") || text.contains("Latency distribution:") {
        return Err(AppError::validation(format!(
            "Unexpected summary without samples:\n{}",
            text
        )));
    }
    if text != "\nError distribution:\n  [2]\trequest timed out after 100ms\n" {
        return Err(AppError::validation(format!("Unexpected output:\n{}", text)));
    }
    Ok(())
}

#[test]
fn empty_report_prints_nothing() -> AppResult<()> {
    let report = aggregate(&[], Duration::from_millis(10))?;
    let text = render_to_string(&report, OutputFormat::Text)?;
    if !text.is_empty() {
        return Err(AppError::validation(format!("Unexpected output:\n{}", text)));
    }
    Ok(())
}

#[test]
fn csv_output_is_suppressed() -> AppResult<()> {
    let outcomes = [Outcome::success(200, Duration::from_millis(100), 10)];
    let report = aggregate(&outcomes, Duration::from_secs(1))?;
    let text = render_to_string(&report, OutputFormat::Csv)?;
    if !text.is_empty() {
        return Err(AppError::validation(format!("Unexpected CSV output:\n{}", text)));
    }
    Ok(())
}
