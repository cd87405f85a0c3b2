//! ghadmin CLI - command-line host for the GitHub organization admin engine.

mod commands;
mod config;
mod output;
mod reporter;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "ghadmin")]
#[command(version)]
#[command(about = "Administer GitHub organizations in bulk")]
#[command(
    long_about = "ghadmin keeps a view of your GitHub organizations up to date and applies \
administrative changes across many repositories at once: topics, team access, custom \
properties, branch protection and rulesets."
)]
#[command(after_long_help = r#"EXAMPLES
    Log in and pick an organization:
        $ ghadmin login --token ghp_xxx
        $ ghadmin org select acme

    List repositories of the selected organization:
        $ ghadmin repos list

    Add topics to several repositories:
        $ ghadmin topics add -t rust -t cli acme/widgets acme/gadgets

    Grant a team push access:
        $ ghadmin access grant --org acme --team core --permission push acme/widgets

    Set a custom property through one batch call:
        $ ghadmin props set --org acme --set tier=gold widgets gadgets

    Keep polling and log every change:
        $ ghadmin watch

    Generate shell completions:
        $ ghadmin completions bash > ~/.local/share/bash-completion/completions/ghadmin

CONFIGURATION
    ghadmin reads configuration from:
      1. ~/.config/ghadmin/config.toml (or $XDG_CONFIG_HOME/ghadmin/config.toml)
      2. ./ghadmin.toml
      3. Environment variables (GHADMIN_* prefix, e.g., GHADMIN_GITHUB_TOKEN)
      4. .env file in current directory

    login, logout and org write the session back to the first file.

ENVIRONMENT VARIABLES
    GHADMIN_GITHUB_TOKEN      GitHub personal access token
    RUST_LOG                  Log filter (default: ghadmin=info,ghadmin_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a token, save it and list your organizations
    Login {
        /// Personal access token
        #[arg(short, long, env = "GHADMIN_GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Forget the saved token and selection
    Logout,
    /// Show connection and organization status
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Organization selection
    Org {
        #[command(subcommand)]
        action: OrgAction,
    },
    /// Repository listing and detail
    Repos {
        #[command(subcommand)]
        action: ReposAction,
    },
    /// Team listing
    Teams {
        #[command(subcommand)]
        action: TeamsAction,
    },
    /// Replace, add or remove repository topics
    Topics {
        /// How the given topics combine with the current ones
        #[arg(value_parser = ["replace", "add", "remove"])]
        mode: String,

        /// Topic (repeatable)
        #[arg(short, long = "topic", required = true)]
        topics: Vec<String>,

        /// Repositories as owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Grant or revoke team access to repositories
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
    /// Custom property values and schema
    Props {
        #[command(subcommand)]
        action: PropsAction,
    },
    /// Classic branch protection
    Protection {
        #[command(subcommand)]
        action: ProtectionAction,
    },
    /// Repository rulesets
    Rulesets {
        #[command(subcommand)]
        action: RulesetsAction,
    },
    /// Poll every organization and log each update until Ctrl+C
    Watch,
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum OrgAction {
    /// Select an organization and show its repositories
    Select {
        org: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Set the organization selected after every login
    Default {
        /// Organization name; empty clears the default
        org: String,
    },
}

#[derive(Subcommand)]
enum ReposAction {
    /// List repositories of an organization
    List {
        /// Organization (default: the selected one)
        #[arg(long)]
        org: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show one repository with teams, properties, protection and rulesets
    Show {
        /// Repository as owner/repo
        repo: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum TeamsAction {
    /// List teams of an organization with member counts
    List {
        /// Organization (default: the selected one)
        #[arg(long)]
        org: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum AccessAction {
    /// Give a team a permission on repositories
    Grant {
        /// Organization owning the team
        #[arg(long)]
        org: String,

        /// Team slug
        #[arg(long)]
        team: String,

        /// Permission: pull, triage, push, maintain or admin
        #[arg(long, default_value = "push")]
        permission: String,

        /// Repositories as owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove a team from repositories
    Revoke {
        /// Organization owning the team
        #[arg(long)]
        org: String,

        /// Team slug
        #[arg(long)]
        team: String,

        /// Repositories as owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum PropsAction {
    /// Set property values on repositories in one batch
    Set {
        /// Organization owning the repositories
        #[arg(long)]
        org: String,

        /// Property as key=value (repeatable). Use key= to clear a value.
        #[arg(long = "set", required = true, value_parser = commands::mutate::parse_property)]
        properties: Vec<(String, serde_json::Value)>,

        /// Repositories as name or owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show the organization's property definitions
    Schema {
        #[arg(long)]
        org: String,
    },
}

#[derive(Subcommand)]
enum ProtectionAction {
    /// Apply a protection policy read from a JSON file
    Set {
        #[arg(short, long)]
        branch: String,

        /// JSON body of the protection policy
        #[arg(short, long)]
        file: PathBuf,

        /// Repositories as owner/repo
        #[arg(required = true)]
        repos: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove protection from a branch
    Delete {
        #[arg(short, long)]
        branch: String,

        /// Repository as owner/repo
        repo: String,
    },
}

#[derive(Subcommand)]
enum RulesetsAction {
    /// Create a ruleset from a JSON file
    Create {
        /// Repository as owner/repo
        repo: String,

        #[arg(short, long)]
        file: PathBuf,
    },
    /// Replace a ruleset with the contents of a JSON file
    Update {
        /// Repository as owner/repo
        repo: String,

        #[arg(long)]
        id: i64,

        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete a ruleset
    Delete {
        /// Repository as owner/repo
        repo: String,

        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("ghadmin=info,ghadmin_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => commands::meta::handle_completions(shell)?,
        Commands::Man { output } => commands::meta::handle_man(output)?,
        Commands::Login { token } => commands::session::handle_login(token, &config).await?,
        Commands::Logout => commands::session::handle_logout(&config).await?,
        Commands::Status { output } => commands::session::handle_status(output, &config).await?,
        Commands::Org { action } => commands::session::handle_org(action, &config).await?,
        Commands::Repos { action } => commands::repos::handle_repos(action, &config).await?,
        Commands::Teams { action } => commands::repos::handle_teams(action, &config).await?,
        Commands::Topics {
            mode,
            topics,
            repos,
            output,
        } => commands::mutate::handle_topics(&mode, &topics, &repos, output, &config).await?,
        Commands::Access { action } => commands::mutate::handle_access(action, &config).await?,
        Commands::Props { action } => commands::mutate::handle_props(action, &config).await?,
        Commands::Protection { action } => {
            commands::mutate::handle_protection(action, &config).await?
        }
        Commands::Rulesets { action } => {
            commands::mutate::handle_rulesets(action, &config).await?
        }
        Commands::Watch => commands::watch::handle_watch(&config).await?,
    }

    Ok(())
}
