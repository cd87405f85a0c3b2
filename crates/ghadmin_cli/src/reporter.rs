use ghadmin::SyncEvent;

/// Logging reporter using tracing for structured output.
#[derive(Debug, Default)]
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncEvent) {
        match event {
            SyncEvent::StatusUpdated(status) => {
                tracing::info!(
                    connected = status.is_connected,
                    polling = status.is_polling,
                    selected_org = %status.selected_org,
                    default_org = %status.default_org,
                    organizations = status.organizations.len(),
                    "Status updated"
                );
            }

            SyncEvent::ReposUpdated { org, repos } => {
                let manageable = repos.iter().filter(|r| r.can_manage).count();
                tracing::info!(org = %org, count = repos.len(), manageable, "Repositories updated");
            }

            SyncEvent::TeamsUpdated { org, teams } => {
                tracing::info!(org = %org, count = teams.len(), "Teams updated");
            }

            SyncEvent::FetchError { org, kind, message } => {
                tracing::warn!(org = %org, kind = ?kind, error = %message, "Fetch failed");
            }

            _ => {
                tracing::debug!(event = event.name(), "Unhandled event");
            }
        }
    }
}
