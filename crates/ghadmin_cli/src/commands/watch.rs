use crate::commands::Host;
use crate::config::Config;
use crate::reporter::LoggingReporter;
use crate::shutdown::install_ctrl_c_handler;

/// Connect with polling enabled and log every event until Ctrl+C.
pub(crate) async fn handle_watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut interrupted = install_ctrl_c_handler();
    let (mut host, status) = Host::connected(config, true).await?;
    tracing::info!(
        organizations = status.organizations.len(),
        interval_mins = config.sync.poll_interval_minutes,
        "Watching organizations"
    );

    let reporter = LoggingReporter::new();
    loop {
        tokio::select! {
            event = host.events.recv() => match event {
                Some(event) => reporter.handle(event),
                None => break,
            },
            changed = interrupted.changed() => {
                if changed.is_err() || *interrupted.borrow() {
                    break;
                }
            }
        }
    }

    host.service.stop_polling().await;
    for event in host.drain() {
        reporter.handle(event);
    }
    Ok(())
}
