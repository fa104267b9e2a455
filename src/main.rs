use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets, Table};
use pmc_harvest::config::{find_config_file, load_config, Config, DEFAULT_WORKERS};
use pmc_harvest::download::{Harvester, RunOptions};
use pmc_harvest::models::{DownloadStats, OutputFormat, RunOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Search PubMed Central and download full-text articles
#[derive(Parser, Debug)]
#[command(name = "pmc-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search PubMed Central and download full-text articles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for persisted artifacts (every format saves as .json)
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// JSON with metadata and a plain-text body
    Text,
    /// JSON with metadata and the raw JATS XML
    Xml,
    /// JSON with metadata, XML, and plain text
    Both,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Xml => OutputFormat::Xml,
            Format::Both => OutputFormat::Both,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search PMC and download full-text articles
    #[command(alias = "d")]
    Download {
        /// Search query (example: "frailty cytokines")
        query: String,

        /// Maximum number of articles to download
        #[arg(long, short, default_value_t = 100)]
        max_results: usize,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Override the NCBI API key (default: NCBI_API_KEY env var)
        #[arg(long)]
        api_key: Option<String>,

        /// Contact e-mail sent to NCBI (default: NCBI_EMAIL env var)
        #[arg(long)]
        email: Option<String>,

        /// Override the outbound User-Agent header
        #[arg(long)]
        user_agent: Option<String>,

        /// Base output directory
        #[arg(long, short, default_value = "publications")]
        output_dir: PathBuf,

        /// Minimum seconds between requests (default: 0.1 with an API key,
        /// 0.334 without)
        #[arg(long)]
        rate_limit: Option<f64>,

        /// Download one article at a time
        #[arg(long)]
        sequential: bool,

        /// Concurrent download workers
        #[arg(long, short, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Leave the plain-text copy out of xml+text artifacts
        #[arg(long)]
        exclude_text: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pmc_harvest={level}")),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = if let Some(path) = &cli.config {
        load_config(path)?
    } else if let Some(path) = find_config_file() {
        tracing::info!("using config file: {}", path.display());
        load_config(&path)?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Download {
            query,
            max_results,
            format,
            api_key,
            email,
            user_agent,
            output_dir,
            rate_limit,
            sequential,
            workers,
            exclude_text,
        } => {
            // CLI flags override file and environment configuration.
            if api_key.is_some() {
                config.credentials.api_key = api_key;
            }
            if email.is_some() {
                config.credentials.email = email;
            }
            if user_agent.is_some() {
                config.http.user_agent = user_agent;
            }
            if rate_limit.is_some() {
                config.rate_limit.interval_secs = rate_limit;
            }
            config.downloads.output_dir = output_dir;

            let opts = RunOptions::new(&query)
                .max_results(max_results)
                .format(format.into())
                .include_text(!exclude_text)
                .workers(if sequential { 1 } else { workers });

            let harvester = Harvester::new(&config)?;
            let stats = harvester.run(&opts).await?;

            print_summary(&stats);

            Ok(match stats.outcome() {
                RunOutcome::Completed => ExitCode::SUCCESS,
                RunOutcome::NoResults => {
                    println!("No results found for '{query}'");
                    ExitCode::from(1)
                }
                RunOutcome::AllFailed => ExitCode::from(2),
            })
        }
    }
}

fn print_summary(stats: &DownloadStats) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(vec!["Download Summary", ""]);
    table.add_row(vec!["Query".to_string(), stats.query.clone()]);
    table.add_row(vec!["Total found".to_string(), stats.total_found.to_string()]);
    table.add_row(vec!["Requested".to_string(), stats.requested.to_string()]);
    table.add_row(vec!["Successful".to_string(), stats.successful.to_string()]);
    table.add_row(vec!["Skipped".to_string(), stats.skipped.to_string()]);
    table.add_row(vec![
        "Failed".to_string(),
        format!(
            "{} ({} unavailable, {} errors)",
            stats.failed, stats.unavailable, stats.errors
        ),
    ]);
    table.add_row(vec![
        "Success rate".to_string(),
        format!("{:.1}%", stats.success_rate()),
    ]);
    table.add_row(vec![
        "Duration".to_string(),
        format!("{:.1}s", stats.duration.as_secs_f64()),
    ]);
    table.add_row(vec![
        "Output directory".to_string(),
        stats.output_dir.display().to_string(),
    ]);
    println!("{table}");
}
