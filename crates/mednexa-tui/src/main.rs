use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mednexa_core::{AnalysisClient, Config, FallbackPolicy, Responder};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod format;
mod handler;
mod tui;
mod ui;

use app::App;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "MEDNEXA_LOG";

#[derive(Parser)]
#[command(name = "mednexa")]
#[command(version, about = "Chat with the Mednexa pharma intelligence agents")]
struct Cli {
    /// Base URL of the analysis service
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs here instead of the default location
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// What to do when the service fails: substitute (built-in answer) or surface
    #[arg(long, global = true, value_parser = parse_policy)]
    fallback: Option<FallbackPolicy>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        query: String,
        /// Extra context passed along with the question
        #[arg(short, long)]
        context: Option<String>,
    },
    /// List generated reports
    Reports,
    /// Show one report
    Report {
        /// Report id
        id: String,
    },
    /// Show per-agent results of a query
    Results {
        /// Query id
        query_id: String,
    },
    /// Download a generated report PDF
    Download {
        /// Stored file name as returned with an analysis
        filename: String,
        /// Directory to save into (defaults to the configured download dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Upload a document for the internal knowledge agent
    Upload {
        /// File to upload
        path: PathBuf,
    },
    /// Show dashboard statistics
    Stats,
    /// Remember an API URL in the config file
    SetUrl {
        url: String,
    },
}

fn parse_policy(s: &str) -> Result<FallbackPolicy, String> {
    FallbackPolicy::from_str(s).ok_or_else(|| format!("unknown fallback policy '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {:#}", e);
        Config::new()
    });

    let interactive = cli.command.is_none();
    init_logging(interactive, cli.log_file.as_deref())?;

    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let policy = cli.fallback.unwrap_or_else(|| config.fallback_policy());

    let client = AnalysisClient::new(&api_url);
    let responder = Responder::new(Arc::new(client.clone())).with_policy(policy);
    info!(%api_url, policy = ?responder.policy(), "starting mednexa");

    match cli.command {
        None => run_tui(App::new(client, responder, config.download_dir())).await,
        Some(Commands::Ask { query, context }) => cli::ask(&responder, &query, context.as_deref()).await,
        Some(Commands::Reports) => cli::list_reports(&client).await,
        Some(Commands::Report { id }) => cli::show_report(&client, &id).await,
        Some(Commands::Results { query_id }) => cli::agent_results(&client, &query_id).await,
        Some(Commands::Download { filename, out }) => {
            let out = out.unwrap_or_else(|| config.download_dir());
            cli::download(&client, &filename, &out).await
        }
        Some(Commands::Upload { path }) => cli::upload(&client, &path).await,
        Some(Commands::Stats) => cli::stats(&client).await,
        Some(Commands::SetUrl { url }) => {
            Config::save_api_url(&url)?;
            println!("API URL saved: {}", url);
            Ok(())
        }
    }
}

/// The TUI owns the terminal, so it logs to a file; subcommands log to stderr.
fn init_logging(interactive: bool, log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    if !interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => Config::config_dir()?.join("mednexa.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!("session ended");
    result
}
