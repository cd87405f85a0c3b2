use console::Term;
use tokio::sync::watch;

/// Install the Ctrl+C handler for `watch`.
///
/// The returned receiver flips to `true` on the first Ctrl+C. A second Ctrl+C
/// exits the process with status 130 without waiting for cleanup.
pub(crate) fn install_ctrl_c_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl+C");
            tx.closed().await;
            return;
        }

        let interactive = Term::stderr().is_term();
        if interactive {
            eprintln!("\n\nStopping the poll loop...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Interrupted, stopping the poll loop");
        }
        let _ = tx.send(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            if interactive {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });

    rx
}
