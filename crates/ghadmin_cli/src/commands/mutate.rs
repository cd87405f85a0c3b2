use std::collections::BTreeMap;
use std::path::Path;

use console::style;
use ghadmin::{BranchProtectionRequest, BulkReport, Ruleset, parse_full_name};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::commands::Host;
use crate::config::Config;
use crate::output::{self, OutputFormat};
use crate::{AccessAction, PropsAction, ProtectionAction, RulesetsAction};

/// Parse a `key=value` property assignment.
///
/// An empty value clears the property. A value in brackets is read as a JSON
/// array for multi-select properties. Everything else is a string.
pub(crate) fn parse_property(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing property name in '{raw}'"));
    }

    let value = value.trim();
    let value = if value.is_empty() {
        Value::Null
    } else if value.starts_with('[') {
        serde_json::from_str::<Vec<String>>(value)
            .map(|items| Value::Array(items.into_iter().map(Value::String).collect()))
            .map_err(|e| format!("invalid list for '{key}': {e}"))?
    } else {
        Value::String(value.to_string())
    };
    Ok((key.to_string(), value))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid JSON in {}: {e}", path.display()).into())
}

fn split_repo(repo: &str) -> Result<(&str, &str), Box<dyn std::error::Error>> {
    parse_full_name(repo)
        .ok_or_else(|| format!("Invalid repository '{repo}' (expected owner/repo)").into())
}

/// Print the report and turn any failure into an error exit.
fn finish(report: &BulkReport, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let failed = output::print_report(report, format)?;
    if failed > 0 {
        return Err(format!(
            "{failed} of {} repositories failed",
            report.outcomes.len()
        )
        .into());
    }
    Ok(())
}

pub(crate) async fn handle_topics(
    mode: &str,
    topics: &[String],
    repos: &[String],
    format: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, _status) = Host::connected(config, false).await?;

    if let [repo] = repos {
        let (owner, name) = split_repo(repo)?;
        let result = host.service.update_topics(owner, name, topics, mode).await?;
        println!(
            "{} {} topics: {}",
            style("✓").green(),
            style(repo).bold(),
            result.join(", ")
        );
        return Ok(());
    }

    let report = host.service.bulk_update_topics(repos, topics, mode).await?;
    finish(&report, format)
}

pub(crate) async fn handle_access(
    action: AccessAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, _status) = Host::connected(config, false).await?;

    let (report, format) = match action {
        AccessAction::Grant {
            org,
            team,
            permission,
            repos,
            output,
        } => {
            let report = host
                .service
                .bulk_update_team_access(&repos, &org, &team, &permission, false)
                .await?;
            (report, output)
        }
        AccessAction::Revoke {
            org,
            team,
            repos,
            output,
        } => {
            let report = host
                .service
                .bulk_update_team_access(&repos, &org, &team, "", true)
                .await?;
            (report, output)
        }
    };
    finish(&report, format)
}

pub(crate) async fn handle_props(
    action: PropsAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, _status) = Host::connected(config, false).await?;

    match action {
        PropsAction::Set {
            org,
            properties,
            repos,
            output,
        } => {
            let properties: BTreeMap<String, Value> = properties.into_iter().collect();
            let report = host
                .service
                .bulk_update_custom_properties(&org, &repos, &properties)
                .await?;
            finish(&report, output)
        }
        PropsAction::Schema { org } => {
            let definitions = host.service.get_custom_property_definitions(&org).await?;
            println!("{}", serde_json::to_string_pretty(&definitions)?);
            Ok(())
        }
    }
}

pub(crate) async fn handle_protection(
    action: ProtectionAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProtectionAction::Set {
            branch,
            file,
            repos,
            output,
        } => {
            let request: BranchProtectionRequest = read_json(&file)?;
            let (host, _status) = Host::connected(config, false).await?;

            if let [repo] = repos.as_slice() {
                let (owner, name) = split_repo(repo)?;
                let applied = host
                    .service
                    .update_branch_protection(owner, name, &branch, &request)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&applied)?);
                return Ok(());
            }

            let report = host
                .service
                .bulk_update_branch_protection(&repos, &branch, &request)
                .await?;
            finish(&report, output)
        }
        ProtectionAction::Delete { branch, repo } => {
            let (owner, name) = split_repo(&repo)?;
            let (host, _status) = Host::connected(config, false).await?;
            host.service
                .delete_branch_protection(owner, name, &branch)
                .await?;
            println!(
                "{} Removed protection from {}:{}",
                style("✓").green(),
                repo,
                branch
            );
            Ok(())
        }
    }
}

pub(crate) async fn handle_rulesets(
    action: RulesetsAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RulesetsAction::Create { repo, file } => {
            let (owner, name) = split_repo(&repo)?;
            let ruleset: Ruleset = read_json(&file)?;
            let (host, _status) = Host::connected(config, false).await?;
            let created = host.service.create_ruleset(owner, name, &ruleset).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        RulesetsAction::Update { repo, id, file } => {
            let (owner, name) = split_repo(&repo)?;
            let ruleset: Ruleset = read_json(&file)?;
            let (host, _status) = Host::connected(config, false).await?;
            let updated = host
                .service
                .update_ruleset(owner, name, id, &ruleset)
                .await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        RulesetsAction::Delete { repo, id } => {
            let (owner, name) = split_repo(&repo)?;
            let (host, _status) = Host::connected(config, false).await?;
            host.service.delete_ruleset(owner, name, id).await?;
            println!("{} Deleted ruleset {id} from {repo}", style("✓").green());
        }
    }
    Ok(())
}
