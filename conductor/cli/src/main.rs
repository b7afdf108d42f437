//! Photo Search - Headless Runner
//!
//! Runs one search cycle against the analysis service and prints every
//! transition as it happens, followed by a summary of the revealed
//! pictures. Useful for scripting and for checking a service deployment
//! without a terminal UI.
//!
//! # Usage
//!
//! ```bash
//! # Search with the default service (http://localhost:5001)
//! photo-search "მინახე 4 ფოტო რომელშიც არის ძაღლი"
//!
//! # Run the second built-in example, JSON summary only
//! photo-search --example 2 --json
//!
//! # Another service, reveal on whatever step arrives last
//! photo-search --url http://search.internal:5001 --terminal-step last "..."
//!
//! # Service checks
//! photo-search --health
//! photo-search --list
//!
//! # Verbose logging
//! RUST_LOG=photo_search_core=debug photo-search "..."
//! ```
//!
//! # Signals
//!
//! - `SIGINT`: abort the cycle and print what was gathered so far

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

use photo_search_core::{
    config, AnalysisService, ConfigOverrides, ControllerConfig, HttpAnalysisService,
    PictureEntry, ProcessStep, ResultStats, SearchConfig, SearchController, SearchMessage,
    SearchResult, SessionState, StepStatus, SubmitOutcome, TerminalStep, ViewMode,
};

/// Photo Search - run one query through the analysis service
#[derive(Parser, Debug)]
#[command(name = "photo-search")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Query text (Georgian or otherwise)
    #[arg(value_name = "QUERY", conflicts_with = "example")]
    query: Option<String>,

    /// Run the Nth example query (1-based) instead of QUERY
    #[arg(short = 'e', long, value_name = "N")]
    example: Option<usize>,

    /// Analysis service origin
    #[arg(short = 'u', long, value_name = "URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "PHOTO_SEARCH_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Step that triggers the reveal: a step id or "last"
    #[arg(short = 't', long, value_name = "STEP", value_parser = parse_terminal_step)]
    terminal_step: Option<TerminalStep>,

    /// Minimum time before the cycle settles, in milliseconds
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print only a JSON summary
    #[arg(long)]
    json: bool,

    /// Check service health and exit
    #[arg(long, conflicts_with_all = ["query", "example", "list"])]
    health: bool,

    /// Print the picture catalog and exit
    #[arg(long, conflicts_with_all = ["query", "example"])]
    list: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "PHOTO_SEARCH_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn parse_terminal_step(s: &str) -> Result<TerminalStep, String> {
    TerminalStep::parse(s).ok_or_else(|| format!("expected a step id or \"last\", got {s:?}"))
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref url) = self.url {
            overrides = overrides.with_url(url.clone());
        }
        if let Some(ms) = self.timeout_ms {
            overrides = overrides.with_timeout_ms(ms);
        }
        if let Some(ms) = self.settle_ms {
            overrides = overrides.with_settle_delay_ms(ms);
        }
        if let Some(step) = self.terminal_step {
            overrides = overrides.with_terminal_step(step);
        }
        overrides
    }

    /// The query to run, from QUERY or `--example`
    fn resolve_query(&self, examples: &[String]) -> Result<String> {
        if let Some(ref query) = self.query {
            return Ok(query.clone());
        }
        match self.example {
            Some(n) if n >= 1 && n <= examples.len() => Ok(examples[n - 1].clone()),
            Some(n) => bail!("No example {n}; {} examples available", examples.len()),
            None => bail!("Nothing to search: pass QUERY or --example N"),
        }
    }
}

fn load_config(args: &Args) -> Result<SearchConfig> {
    let mut config = match args.config {
        Some(ref path) => config::load_config_from_path(Some(path.clone())),
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;

    args.overrides().apply(&mut config);
    config.validate()?;

    info!(
        url = %config.service.url,
        source = %config.source(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Final report of one run
#[derive(Debug, Serialize)]
struct Summary<'a> {
    query: &'a str,
    cycle: u64,
    started_at: Option<String>,
    search_completed: bool,
    view: ViewMode,
    result: Option<&'a SearchResult>,
    stats: Option<ResultStats>,
    steps: &'a [ProcessStep],
    pictures: &'a [PictureEntry],
    messages: &'a [SearchMessage],
}

impl<'a> Summary<'a> {
    fn new(session: &'a SessionState, messages: &'a [SearchMessage]) -> Self {
        Self {
            query: &session.query,
            cycle: session.cycle.0,
            started_at: session.cycle_started_at.map(|t| t.to_rfc3339()),
            search_completed: session.search_completed,
            view: session.view_mode(),
            result: session.result.as_ref(),
            stats: session.stats(),
            steps: &session.steps,
            pictures: &session.pictures,
            messages,
        }
    }
}

fn status_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "·",
        StepStatus::Active => "⟳",
        StepStatus::Completed => "✓",
    }
}

fn print_summary(session: &SessionState) {
    println!();
    for step in &session.steps {
        println!("  {} {:>2}  {}", status_icon(step.status), step.id, step.text);
    }

    let Some(ref result) = session.result else {
        println!("No result.");
        return;
    };
    println!("Original:      {}", result.original);
    println!(
        "Photo search:  {}",
        if result.is_photo_search { "yes" } else { "no" }
    );
    if let Some(ref terms) = result.simplified_query {
        println!("Search terms:  {terms}");
    }
    if let Some(stats) = session.stats() {
        if let Some(requested) = stats.requested {
            println!("Requested:     {requested}");
        }
        if let Some(found) = stats.found {
            println!("Found:         {found}");
        }
        println!("Processing:    {}", stats.processing);
    }

    match session.view_mode() {
        ViewMode::Found => {
            println!("\nFound Pictures ({})", session.pictures.len());
            for picture in &session.pictures {
                println!("  {}  [{}]  {}", picture.name, picture.kind, picture.tag_line());
            }
        }
        ViewMode::NotASearch => println!("\nNo Search Query"),
        ViewMode::Browse => println!("\nSearch did not complete"),
    }
}

fn print_catalog(pictures: &[PictureEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(pictures)?);
        return Ok(());
    }
    println!("Available Pictures ({})", pictures.len());
    for picture in pictures {
        println!("  {}  [{}]  {}", picture.name, picture.kind, picture.tag_line());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = load_config(&args)?;
    let service = HttpAnalysisService::from_config(&config.service)
        .context("Failed to build HTTP client")?;

    if args.health {
        let healthy = service.health_check().await;
        println!(
            "{} is {}",
            service.origin(),
            if healthy { "healthy" } else { "unreachable" }
        );
        return Ok(if healthy {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = SearchController::new(service, ControllerConfig::from(&config), tx);
    controller.start().await;

    if args.list {
        print_catalog(controller.catalog().all(), args.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let query = args.resolve_query(controller.examples())?;
    controller.set_query(query);
    if let SubmitOutcome::Ignored(reason) = controller.submit() {
        bail!("Search not started: {reason}");
    }

    let started = Instant::now();
    let mut transcript = Vec::new();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping cycle");
                controller.shutdown();
                break;
            }
            more = controller.wait_event() => {
                while let Ok(msg) = rx.try_recv() {
                    if !args.json && msg.cycle().is_some() {
                        println!("[{:>6.1}s] {msg}", started.elapsed().as_secs_f64());
                    }
                    transcript.push(msg);
                }
                if !more {
                    break;
                }
            }
        }
    }

    let session = controller.session();
    if args.json {
        let summary = Summary::new(session, &transcript);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(session);
    }

    let failed = transcript
        .iter()
        .any(|m| matches!(m, SearchMessage::CycleFailed { .. }));
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
