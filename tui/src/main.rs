//! Photo Search TUI Entry Point
//!
//! Launches the terminal UI against the analysis service named in the
//! configuration (`search.toml`, `PHOTO_SEARCH_*` environment variables).
//!
//! Usage:
//!   photo-search-tui
//!
//! Logs go to `photo-search-tui.log` in the user cache directory; set
//! `RUST_LOG` to change the level.

use std::fs::{self, File};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_search_core::{load_config, ControllerConfig, HttpAnalysisService};
use photo_search_tui::{App, SearchClient};

/// Where the log file lives
fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("photo-search")
        .join("photo-search-tui.log")
}

/// Log to a file so the terminal stays clean
fn init_logging() -> anyhow::Result<()> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: photo-search-tui requires a terminal (TTY)");
        eprintln!("For scripted use, run the `photo-search` CLI instead.");
        std::process::exit(1);
    }

    let config = load_config()?;
    config.validate()?;
    tracing::info!(url = %config.service.url, source = %config.source(), "Starting TUI");
    let service = HttpAnalysisService::from_config(&config.service)?;
    let client = SearchClient::new(service, ControllerConfig::from(&config));

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = run_app(&mut terminal, client).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: SearchClient,
) -> anyhow::Result<()> {
    let mut app = App::new(client)?;
    app.run(terminal).await
}
