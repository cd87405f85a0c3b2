use console::style;
use ghadmin::{FetchKind, SyncEvent};

use crate::OrgAction;
use crate::commands::{Host, Resume, rejected_message};
use crate::config::Config;
use crate::output::{self, OutputFormat};

pub(crate) async fn handle_login(
    token: Option<String>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = token
        .or_else(|| config.github_token())
        .ok_or("No token given. Pass --token or set GHADMIN_GITHUB_TOKEN.")?;

    let host = Host::new(config, false)?;
    let status = host.service.connect(&token).await?;

    println!(
        "{} Logged in, {} organization(s) available",
        style("✓").green(),
        status.organizations.len()
    );
    println!("Session saved to: {}", host.store.path().display());
    output::print_status(&status, OutputFormat::Table)
}

pub(crate) async fn handle_logout(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let host = Host::new(config, false)?;
    host.service.disconnect().await;
    println!("{} Logged out", style("✓").green());
    if std::env::var_os("GHADMIN_GITHUB_TOKEN").is_some() {
        println!(
            "{}",
            style("GHADMIN_GITHUB_TOKEN is still set and will be used on the next command.")
                .yellow()
        );
    }
    Ok(())
}

pub(crate) async fn handle_status(
    format: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, outcome) = Host::resume(config, false).await?;
    if let Resume::Rejected(e) = &outcome {
        eprintln!("{} {}", style("!").yellow(), rejected_message(e));
    }
    output::print_status(&host.service.status(), format)
}

pub(crate) async fn handle_org(
    action: OrgAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        OrgAction::Select { org, output } => {
            let (mut host, _status) = Host::connected(config, false).await?;
            if let Some(fetch) = host.service.select_organization(&org).await {
                fetch.await?;
            }

            for event in host.drain() {
                match event {
                    SyncEvent::ReposUpdated { org: updated, repos } if updated == org => {
                        output::print_repos(&repos, output)?;
                    }
                    SyncEvent::FetchError {
                        org: failed,
                        kind,
                        message,
                    } if failed == org => {
                        let what = match kind {
                            FetchKind::Repos => "repositories",
                            FetchKind::Teams => "teams",
                        };
                        eprintln!(
                            "{} Could not fetch {what}: {message}",
                            style("!").yellow()
                        );
                    }
                    _ => {}
                }
            }
            println!("{} Selected {}", style("✓").green(), style(&org).bold());
        }
        OrgAction::Default { org } => {
            let host = Host::new(config, false)?;
            let status = host.service.set_default_organization(&org).await;
            if status.default_org.is_empty() {
                println!("{} Default organization cleared", style("✓").green());
            } else {
                println!(
                    "{} Default organization set to {}",
                    style("✓").green(),
                    style(&status.default_org).bold()
                );
            }
        }
    }
    Ok(())
}
