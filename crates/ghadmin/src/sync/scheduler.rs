//! The background poll loop.
//!
//! On start the scheduler runs one fetch pass immediately, then waits a fixed
//! interval measured from the end of that pass and repeats. Cancellation is
//! observed only between passes: a pass that has started always finishes.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::fetch::{FetchContext, fetch_all_orgs};

/// Handle to a running poll loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct PollScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollScheduler {
    /// Spawn the loop. `organizations` is read at the start of every pass so
    /// the loop follows changes to the organization list.
    pub fn start<F>(ctx: FetchContext, organizations: F, interval: Duration) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Poll scheduler started");

            while !token.is_cancelled() {
                let orgs = organizations();
                fetch_all_orgs(&ctx, &orgs).await;

                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }

            info!("Poll scheduler stopped");
        });

        Self { cancel, handle }
    }

    /// Request the loop to exit at its next check. Does not wait.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
