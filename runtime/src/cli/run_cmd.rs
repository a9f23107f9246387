//! Run the watchdog until interrupted.

use super::{build_runner, load_settings, Overrides};
use anyhow::Result;
use std::future::Future;
use std::path::Path;
use tracing::{info, warn};

/// Poll forever; Ctrl-C or SIGTERM stops the loop and releases the browser.
pub async fn run(config: &Path, overrides: Overrides) -> Result<()> {
    let settings = load_settings(config, overrides)?;
    info!("starting sitewatch v{}", env!("CARGO_PKG_VERSION"));

    let mut runner = build_runner(&settings)?;
    runner.run_until(shutdown_signal()).await;
    Ok(())
}

/// Resolves on the first Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = signal_or_pending("Ctrl-C", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("received shutdown signal");
}

/// Resolve when `listener` reports the signal; never resolve if it fails.
async fn signal_or_pending<F>(name: &str, listener: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        warn!("cannot listen for {name}: {e}");
        std::future::pending::<()>().await
    }
}
