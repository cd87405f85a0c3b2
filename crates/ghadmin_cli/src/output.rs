//! Table and JSON rendering for command output.

use clap::ValueEnum;
use console::style;
use ghadmin::{BulkReport, OrgStatus, RepoDetail, RepoSummary, Team};
use serde::Serialize;
use tabled::Tabled;

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{}", table);
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[derive(Debug, Tabled)]
struct RepoRow {
    #[tabled(rename = "Repository")]
    full_name: String,
    #[tabled(rename = "Visibility")]
    visibility: String,
    #[tabled(rename = "Default Branch")]
    default_branch: String,
    #[tabled(rename = "Archived")]
    archived: &'static str,
    #[tabled(rename = "Fork")]
    fork: &'static str,
    #[tabled(rename = "Admin")]
    can_manage: &'static str,
    #[tabled(rename = "Topics")]
    topics: String,
}

impl From<&RepoSummary> for RepoRow {
    fn from(repo: &RepoSummary) -> Self {
        Self {
            full_name: repo.full_name.clone(),
            visibility: format!("{:?}", repo.visibility).to_lowercase(),
            default_branch: repo.default_branch.clone(),
            archived: yes_no(repo.archived),
            fork: yes_no(repo.is_fork),
            can_manage: yes_no(repo.can_manage),
            topics: repo.topics.join(", "),
        }
    }
}

#[derive(Debug, Tabled)]
struct TeamRow {
    #[tabled(rename = "Team")]
    name: String,
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Members")]
    member_count: u32,
    #[tabled(rename = "URL")]
    url: String,
}

#[derive(Debug, Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Repository")]
    repo: String,
    #[tabled(rename = "Result")]
    result: String,
}

#[derive(Debug, Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub(crate) fn print_repos(
    repos: &[RepoSummary],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => print_table(repos.iter().map(RepoRow::from).collect()),
        OutputFormat::Json => print_json(repos)?,
    }
    Ok(())
}

pub(crate) fn print_teams(
    teams: &[Team],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => print_table(
            teams
                .iter()
                .map(|t| TeamRow {
                    name: t.name.clone(),
                    slug: t.slug.clone(),
                    member_count: t.member_count,
                    url: t.url.clone(),
                })
                .collect(),
        ),
        OutputFormat::Json => print_json(teams)?,
    }
    Ok(())
}

pub(crate) fn print_status(
    status: &OrgStatus,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            let connection = if status.is_connected {
                style("connected").green().to_string()
            } else {
                style("disconnected").red().to_string()
            };
            print_table(vec![
                FieldRow {
                    field: "Connection",
                    value: connection,
                },
                FieldRow {
                    field: "Polling",
                    value: yes_no(status.is_polling).to_string(),
                },
                FieldRow {
                    field: "Selected",
                    value: status.selected_org.clone(),
                },
                FieldRow {
                    field: "Default",
                    value: status.default_org.clone(),
                },
                FieldRow {
                    field: "Organizations",
                    value: status.organizations.join(", "),
                },
            ]);
        }
        OutputFormat::Json => print_json(status)?,
    }
    Ok(())
}

pub(crate) fn print_detail(
    detail: &RepoDetail,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if let OutputFormat::Json = format {
        return print_json(detail);
    }

    let summary = &detail.summary;
    println!("{}", style(&summary.full_name).bold());
    if !detail.description.is_empty() {
        println!("{}", detail.description);
    }
    println!("{}", style(&summary.url).dim());
    println!();

    print_table(vec![
        FieldRow {
            field: "Visibility",
            value: format!("{:?}", summary.visibility).to_lowercase(),
        },
        FieldRow {
            field: "Default branch",
            value: summary.default_branch.clone(),
        },
        FieldRow {
            field: "Stars",
            value: detail.stars.to_string(),
        },
        FieldRow {
            field: "Watchers",
            value: detail.watchers.to_string(),
        },
        FieldRow {
            field: "Forks",
            value: detail.fork_count.to_string(),
        },
        FieldRow {
            field: "Open PRs",
            value: detail.open_pr_count.to_string(),
        },
        FieldRow {
            field: "Branches",
            value: detail.branch_count.to_string(),
        },
        FieldRow {
            field: "Topics",
            value: summary.topics.join(", "),
        },
        FieldRow {
            field: "Protected",
            value: detail
                .branch_protection
                .iter()
                .map(|b| b.branch_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        },
        FieldRow {
            field: "Rulesets",
            value: detail
                .rulesets
                .iter()
                .map(|r| format!("{} ({})", r.name, r.enforcement))
                .collect::<Vec<_>>()
                .join(", "),
        },
    ]);

    if !detail.teams.is_empty() {
        println!();
        print_table(
            detail
                .teams
                .iter()
                .map(|t| FieldRow {
                    field: "Team",
                    value: format!("{} ({})", t.slug, t.permission),
                })
                .collect(),
        );
    }

    if !detail.custom_properties.is_empty() {
        println!();
        for (name, value) in &detail.custom_properties {
            println!("  {} = {}", style(name).cyan(), value);
        }
    }
    Ok(())
}

/// Print a bulk report. Returns the number of failed repositories.
pub(crate) fn print_report(
    report: &BulkReport,
    format: OutputFormat,
) -> Result<usize, Box<dyn std::error::Error>> {
    let failed = report.failed().count();
    match format {
        OutputFormat::Table => {
            let mut rows: Vec<OutcomeRow> = report
                .outcomes
                .iter()
                .map(|o| OutcomeRow {
                    repo: o.repo.clone(),
                    result: match &o.error {
                        None => style("ok").green().to_string(),
                        Some(e) => style(e).red().to_string(),
                    },
                })
                .collect();
            rows.extend(report.skipped.iter().map(|name| OutcomeRow {
                repo: name.clone(),
                result: style("skipped: not owner/repo").yellow().to_string(),
            }));
            print_table(rows);
        }
        OutputFormat::Json => print_json(report)?,
    }
    Ok(failed)
}
