use salvo::shutdown::{StopHandle, wait_for_shutdown};
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Stops the run on Ctrl+C or SIGTERM. The task exits on its own once the
/// run is stopped for any other reason.
pub fn setup_signal_shutdown_handler(stop: &StopHandle) -> tokio::task::JoinHandle<()> {
    let stop = stop.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = stop.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                eprintln!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    if stop.stop() {
                        info!("Interrupted; finishing in-flight requests");
                    }
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    if stop.stop() {
                        info!("Terminated; finishing in-flight requests");
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    if stop.stop() {
                        info!("Interrupted; finishing in-flight requests");
                    }
                }
            }
        }
    })
}
