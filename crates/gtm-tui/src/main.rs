use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gtm_core::{spawn_call_count_poller, Agent, Config, StatsClient, Team, WebhookClient};
use tracing_subscriber::EnvFilter;

mod app;
mod ask;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "gtm_core=info,gtm_intel=info";

#[derive(Parser)]
#[command(name = "gtm-intel")]
#[command(version, about = "Ask questions about your recorded sales calls")]
struct Cli {
    /// Sales-agent webhook URL (overrides config and GTM_WEBHOOK_URL)
    #[arg(long, global = true)]
    webhook_url: Option<String>,

    /// Call-count stats URL (overrides config and GTM_STATS_URL)
    #[arg(long, global = true)]
    stats_url: Option<String>,

    /// Team whose question cards are shown: sales, pmm or product
    #[arg(long, global = true)]
    team: Option<String>,

    /// Write logs here instead of the config directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_file.clone())?;

    let mut config = Config::load().context("Failed to load config")?;
    config.apply_overrides(cli.webhook_url.clone(), cli.stats_url.clone());

    let team = match cli.team.as_deref() {
        Some(name) => Team::from_str(name)
            .with_context(|| format!("Unknown team '{}' (expected sales, pmm or product)", name))?,
        None => config.team(),
    };

    tracing::info!(webhook = %config.webhook_url, team = team.as_str(), "Starting");

    match cli.command {
        Some(Commands::Ask { question }) => ask::ask(&config.webhook_url, &question, &config.pricing).await,
        None => run_tui(config, team).await,
    }
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging(log_file: Option<PathBuf>) -> Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => Config::config_dir()?.join("gtm-intel.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_tui(config: Config, team: Team) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let poller = config.stats_url.as_deref().map(|url| {
        let tx = events.sender();
        let period = Duration::from_secs(config.stats_poll_secs.max(1));
        spawn_call_count_poller(StatsClient::new(url), period, move |count| {
            tx.send(AppEvent::CallCount(count)).is_ok()
        })
    });

    let agent: Arc<dyn Agent> = Arc::new(WebhookClient::new(&config.webhook_url));
    let config_path = Config::config_path().ok();
    let mut app = App::new(agent, events.sender(), team, config.pricing, config_path);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    if let Some(poller) = poller {
        poller.abort();
    }
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
