// src/main.rs
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::prelude::*;
use tracing::{error, info};

mod app;
mod config;
mod detail;
mod input;
mod logging;
mod models;
mod network;
mod poller;
mod refresh;
mod summary_view;
mod theme;
mod ui;
mod utils;

use crate::app::{App, AppOptions};
use crate::config::Settings;
use crate::models::Window;
use crate::network::{HttpMetricsApi, MetricsApi};
use crate::poller::Poller;
use crate::summary_view::summary_ticker;

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about = "Live terminal dashboard for your git commit habits")]
struct Cli {
    /// Base URL of the metrics API (overrides config and HABITDASH_API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Lookback window: 6h, 24h or 7d
    #[arg(short, long)]
    window: Option<String>,

    /// Summary polling interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Open the detail view for this repository id
    #[arg(long)]
    repo: Option<i64>,

    /// Print the current summary once and exit
    #[arg(long)]
    once: bool,

    /// Check that the metrics API is reachable and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::new().context("could not load configuration")?;
    if let Some(api_base) = &cli.api_base {
        settings.api_base = api_base.clone();
    }
    if let Some(window) = &cli.window {
        settings.window = window.clone();
    }
    if let Some(interval) = cli.interval {
        settings.poll_interval_secs = interval;
    }

    let interactive = !(cli.once || cli.check);
    let log_path = if interactive { settings.log_path() } else { None };
    logging::init_logging(log_path.as_deref())?;
    crate::config::seed_user_config();

    let http = HttpMetricsApi::new(&settings.api_base, settings.request_timeout())?;
    info!(api_base = %http.base(), window = %settings.window(), "starting");
    let api: Arc<dyn MetricsApi> = Arc::new(http);

    if cli.check {
        let health = api.health().await?;
        println!("{}: {}", settings.api_base, health.status);
        return Ok(());
    }
    if cli.once {
        return print_once(api, settings.window()).await;
    }

    run_tui(api, &settings, cli.repo).await
}

async fn print_once(api: Arc<dyn MetricsApi>, window: Window) -> anyhow::Result<()> {
    let poller = Poller::new("summary", Duration::from_secs(1), move || {
        let api = Arc::clone(&api);
        async move { api.fetch_summary(window).await }
    });
    poller.revalidate().await?;
    let Some(snapshot) = poller.current().data else {
        anyhow::bail!("metrics API returned no summary");
    };
    println!("{}", summary_ticker(&snapshot));
    for repo in &snapshot.per_repo {
        let visibility = if repo.is_private { "private" } else { "public" };
        println!("  {:<40} {:>5}  {}", repo.full_name, repo.commits_count, visibility);
    }
    Ok(())
}

async fn run_tui(api: Arc<dyn MetricsApi>, settings: &Settings, repo: Option<i64>) -> anyhow::Result<()> {
    let mut app = App::new(api, AppOptions::from(settings));
    let polling = app.start();
    if let Some(repo_id) = repo {
        app.open_repo(repo_id);
    }

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app).await;

    // Restore the terminal even when the loop failed.
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown();
    let _ = polling.await;
    if let Err(e) = &result {
        error!(error = %e, "dashboard exited with an error");
    }
    result
}

async fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    let mut changes = app.changes();

    loop {
        terminal.draw(|f| ui::render(f, &*app))?;

        tokio::select! {
            _ = frames.tick() => app.on_tick(Instant::now()),
            _ = changes.changed() => app.sync(Instant::now()),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if input::handle_key(key, app)? {
                        break;
                    }
                    app.sync(Instant::now());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }
    Ok(())
}
