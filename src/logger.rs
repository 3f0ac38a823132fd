use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// the report.
///
/// `SALVO_LOG` takes precedence over `RUST_LOG`; without either, `--verbose`
/// selects `debug` and the default is `warn`.
pub fn init_logging(verbose: bool, no_color: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = std::env::var("SALVO_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(default_level),
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
