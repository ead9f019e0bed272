//! Signal handling: the external collaborator that cancels the root
//! deadline, mirroring the original `signalHandler` goroutine.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawns a task that triggers `token` on SIGINT (Ctrl-C), so an interrupted
/// run still drains Workers and prints a report instead of dying mid-flight.
pub fn install(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            token.cancel();
        }
    });
}
