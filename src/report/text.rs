use std::io::Write;

use crate::metrics::{LatencySummary, Report};

const BAR_CHAR: char = '∎';
const BAR_WIDTH: u64 = 40;
const LATENCY_PERCENTILES: [(u8, f64); 7] = [
    (10, 0.10),
    (25, 0.25),
    (50, 0.50),
    (75, 0.75),
    (90, 0.90),
    (95, 0.95),
    (99, 0.99),
];

pub(super) fn render_text<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    if let Some(summary) = report.summary() {
        write_summary(&summary, out)?;
        write_status_codes(report, out)?;
        write_histogram(report, out)?;
        write_latencies(report, out)?;
    }

    if !report.errors.is_empty() {
        write_errors(report, out)?;
    }
    Ok(())
}

fn write_summary<W: Write>(summary: &LatencySummary, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nSummary:")?;
    writeln!(out, "  Total:\t{:4.4} secs.", summary.total.as_secs_f64())?;
    writeln!(out, "  Slowest:\t{:4.4} secs.", summary.slowest)?;
    writeln!(out, "  Fastest:\t{:4.4} secs.", summary.fastest)?;
    writeln!(out, "  Average:\t{:4.4} secs.", summary.average)?;
    writeln!(out, "  Requests/sec:\t{:4.4}", summary.requests_per_sec)?;
    if summary.size_total > 0 {
        writeln!(out, "  Total Data Received:\t{} bytes.", summary.size_total)?;
        writeln!(
            out,
            "  Response Size per Request:\t{} bytes.",
            summary.size_per_request
        )?;
    }
    Ok(())
}

fn write_status_codes<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nStatus code distribution:")?;
    for (code, count) in &report.status_codes {
        writeln!(out, "  [{}]\t{} responses", code, count)?;
    }
    Ok(())
}

fn write_histogram<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nResponse time histogram:")?;
    let bins = report.histogram.bins();
    let max = bins.iter().map(|bin| bin.count).max().unwrap_or(0);
    for bin in bins {
        let bar_len = bin
            .count
            .saturating_mul(BAR_WIDTH)
            .checked_div(max)
            .unwrap_or(0);
        let bar: String = std::iter::repeat_n(BAR_CHAR, usize::try_from(bar_len).unwrap_or(0))
            .collect();
        writeln!(out, "  {:4.3} [{}]\t|{}", bin.value, bin.count, bar)?;
    }
    Ok(())
}

fn write_latencies<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nLatency distribution:")?;
    for (label, p) in LATENCY_PERCENTILES {
        let latency = report.histogram.quantile(p);
        if latency > 0.0 {
            writeln!(out, "  {}% in {:4.4} secs.", label, latency)?;
        }
    }
    Ok(())
}

fn write_errors<W: Write>(report: &Report, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "\nError distribution:")?;
    for (message, count) in &report.errors {
        writeln!(out, "  [{}]\t{}", count, message)?;
    }
    Ok(())
}
