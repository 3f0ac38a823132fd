use std::io::Write;

use tracing::{debug, error, info};

use salvo::args::LoadArgs;
use salvo::config::resolve_run_settings;
use salvo::engine::Engine;
use salvo::error::AppResult;
use salvo::http::{build_request_template, setup_transport};
use salvo::metrics::Report;
use salvo::report;

use crate::shutdown_handlers::setup_signal_shutdown_handler;

use super::progress::{ProgressGoal, ProgressIndicator};

/// Runs one load test from fully merged arguments and prints its report to
/// stdout.
pub(crate) async fn run_local(args: LoadArgs) -> AppResult<Report> {
    let settings = resolve_run_settings(&args)
        .inspect_err(|err| error!("Invalid run configuration: {}", err))?;
    let template = build_request_template(&args)
        .inspect_err(|err| error!("Failed to build request template: {}", err))?;
    let transport = setup_transport(&args)
        .inspect_err(|err| error!("Failed to set up HTTP transport: {}", err))?;
    info!(
        "{} {} with {} workers",
        template.method(),
        template.url(),
        settings.concurrency
    );

    let mut engine = Engine::new(settings, template, transport);
    let stop = engine.stop_handle();
    let signal_handle = setup_signal_shutdown_handler(&stop);

    let progress_handle = if args.no_progress {
        None
    } else {
        let (indicator, handle) =
            ProgressIndicator::spawn(ProgressGoal::from(settings.mode), args.no_color);
        engine.set_progress(indicator)?;
        Some(handle)
    };

    let result = engine.run().await;

    // Releases the signal handler when the run ended on its own.
    stop.stop();
    signal_handle.await?;
    if let Some(handle) = progress_handle {
        handle.await?;
    }

    let report = result?;
    debug!(
        "{} successful, {} failed",
        report.success_count(),
        report.error_count()
    );

    let mut out = std::io::stdout().lock();
    report::render(&report, args.output, &mut out)?;
    out.flush()?;
    Ok(report)
}
