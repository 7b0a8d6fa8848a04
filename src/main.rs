//! okr-fetcher - GitHub OKR status report generator
//!
//! Fetches OKR issues and their weekly-update comments from GitHub,
//! resolves the objective / key-result hierarchy, and renders a status
//! report in Markdown or JSON.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use chrono::Utc;
use okr_fetcher::config::Config;
use okr_fetcher::error::OkrError;
use okr_fetcher::github::{GitHubClient, HttpTransport};
use okr_fetcher::okr::OkrService;
use okr_fetcher::report;

#[derive(Parser)]
#[command(name = "okr-fetcher")]
#[command(version)]
#[command(about = "Generate OKR status reports from GitHub issues", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch issues and generate the report
    Generate {
        /// Configuration file path
        #[arg(short, long, default_value = "okr-fetcher.toml")]
        config: PathBuf,

        /// GitHub API token (never logged or cached)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,

        /// Output file (overrides config; "-" or empty means stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: markdown or json (overrides config)
        #[arg(short, long)]
        format: Option<String>,

        /// Search query (overrides config and label synthesis)
        #[arg(short, long)]
        query: Option<String>,

        /// Disable the response cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Print API usage statistics to stderr after the run
        #[arg(long)]
        stats: bool,
    },

    /// Write a commented example configuration file
    InitConfig {
        /// Destination path
        #[arg(default_value = "okr-fetcher.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "okr_fetcher=debug,info"
    } else {
        "okr_fetcher=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands) -> Result<(), OkrError> {
    match command {
        Commands::Generate {
            config,
            token,
            output,
            format,
            query,
            no_cache,
            stats,
        } => generate(config, token, output, format, query, no_cache, stats).await,
        Commands::InitConfig { path, force } => init_config(&path, force),
    }
}

#[allow(clippy::too_many_arguments)]
async fn generate(
    config_path: PathBuf,
    token: String,
    output: Option<PathBuf>,
    format: Option<String>,
    query: Option<String>,
    no_cache: bool,
    stats: bool,
) -> Result<(), OkrError> {
    if token.trim().is_empty() {
        return Err(OkrError::invalid_config(
            "token",
            "GITHUB_TOKEN must not be empty",
        ));
    }

    let mut config = Config::load(&config_path)?;
    if let Some(format) = format {
        config.output.format = format;
    }
    if no_cache {
        config.cache.enabled = false;
    }
    config.validate()?;

    let query = match query {
        Some(q) => q,
        None => config.search_query(),
    };
    debug!(%query, "resolved search query");

    // Cancel in-flight work on Ctrl-C; a second Ctrl-C kills the process.
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, shutting down...".yellow());
            ctrl_c_cancel.cancel();
        }
    });

    let transport = Arc::new(HttpTransport::new(&token, config.timeout())?);
    let client = GitHubClient::new(transport, config.fetch_options())
        .with_cancellation(cancel.clone());
    let service = OkrService::new(client, config.service_options());

    let report = service.build_report(&query).await?;
    for warning in &report.warnings {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }

    let generated_at = Utc::now();
    let rendered = match config.output.format.as_str() {
        "json" => report::render_json(&report, &config.output.title, generated_at)?,
        _ => report::render_markdown(&report, &config.output.title, generated_at),
    };

    let destination = output
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.output.file.clone());
    if destination.is_empty() || destination == "-" {
        println!("{rendered}");
    } else {
        std::fs::write(&destination, &rendered)?;
        eprintln!(
            "{} report written to {}",
            "Done:".green().bold(),
            destination
        );
    }

    if stats {
        eprintln!("{}", service.client().stats().snapshot());
    }
    Ok(())
}

fn init_config(path: &PathBuf, force: bool) -> Result<(), OkrError> {
    if path.exists() && !force {
        return Err(OkrError::config_with_path(
            "file already exists (use --force to overwrite)",
            path.clone(),
        ));
    }
    Config::write_example(path)?;
    println!(
        "{} example configuration written to {}",
        "Done:".green().bold(),
        path.display()
    );
    Ok(())
}
