use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use mazebots_app::{RunSummary, load_config, load_segments};
use mazebots_core::{MazeBotsConfig, Script};
use mazebots_search::{SearchEvent, SearchEventKind, WorkerReport};
use owo_colors::OwoColorize;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(
    name = "mazebots",
    version,
    about = "Evolve maze-exploring scripts with a parallel archive search"
)]
struct Cli {
    /// JSON configuration file; omitted fields use defaults.
    #[arg(long, env = "MAZEBOTS_CONFIG")]
    config: Option<PathBuf>,

    /// Wall layout as a JSON array of [x1, y1, x2, y2] segments.
    #[arg(long)]
    walls: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long)]
    workers: Option<usize>,

    /// Base RNG seed; worker i uses seed + i.
    #[arg(long)]
    seed: Option<u64>,

    /// Wall-clock run time before stopping the workers.
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Print every event as a JSON line on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = resolve_config(&cli)?;
    let segments = match &cli.walls {
        Some(path) => load_segments(path)?,
        None => Vec::new(),
    };
    info!(
        workers = config.workers,
        width = config.grid_width,
        height = config.grid_height,
        segments = segments.len(),
        duration_secs = cli.duration_secs,
        "starting MazeBots search"
    );

    let handle = mazebots_search::spawn(&config, &segments).context("failed to start search")?;
    let mut summary = RunSummary::new();
    let deadline = Instant::now() + Duration::from_secs(cli.duration_secs);
    while Instant::now() < deadline {
        let events = handle.drain();
        if events.is_empty() {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        record(&mut summary, &events, cli.json)?;
    }

    let outcome = handle.shutdown();
    record(&mut summary, &outcome.events, cli.json)?;
    if cli.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary, &outcome.reports);
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<MazeBotsConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MazeBotsConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }
    config.validate().context("invalid command-line overrides")?;
    Ok(config)
}

fn record(summary: &mut RunSummary, events: &[SearchEvent], json: bool) -> Result<()> {
    for event in events {
        summary.apply(event);
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else if let SearchEventKind::Best {
            score, generation, ..
        } = &event.kind
        {
            println!(
                "{} worker {} score {:.2} gen {}",
                "best".green().bold(),
                event.worker,
                score,
                generation
            );
        } else if let SearchEventKind::StagnationReset = event.kind {
            println!("{} worker {}", "reset".yellow().bold(), event.worker);
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, reports: &[WorkerReport]) {
    println!("{}", "-".repeat(48).dimmed());
    println!(
        "{:<8} {:>12} {:>12} {:>8} {:>10}",
        "WORKER".bold().cyan(),
        "ATTEMPTS".bold().cyan(),
        "EVALUATED".bold().cyan(),
        "RESETS".bold().cyan(),
        "BEST".bold().cyan()
    );
    for report in reports {
        println!(
            "{:<8} {:>12} {:>12} {:>8} {:>10.2}",
            report.worker, report.attempts, report.evaluated, report.resets, report.best_score
        );
    }
    println!("{} {}", "attempts".bold(), summary.attempts);

    let Some(best) = &summary.best else {
        println!("{}", "No best script reported".yellow());
        return;
    };
    println!(
        "{} {:.2} (worker {}, gen {})",
        "best score".green().bold(),
        best.score,
        best.worker,
        best.generation
    );
    match best.decode() {
        Some(script) => print_listing(&script),
        None => println!("{:?}", best.script),
    }
}

fn print_listing(script: &Script) {
    println!("{} {}", "identity".bold(), script.identity());
    for line in script.listing() {
        println!("  {}", line.dimmed());
    }
}
