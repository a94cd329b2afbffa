//! NavGrade CLI
//!
//! The `navgrade` command grades recorded web-agent trajectories offline.
//!
//! ## Commands
//!
//! - `grade`: Replay one trajectory against one task and print the result
//! - `batch`: Grade a manifest of episodes concurrently, with resume
//! - `summary`: Per-evaluator score summary of stored results
//! - `canonicalize`: Show the canonical form of a URL
//! - `decode-flight`: Decode a flight search results URL

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, Instrument, Level};

use navgrade_core::batch::{summarize, EpisodeReport};
use navgrade_core::canonical::resy::ResyMatchKeys;
use navgrade_core::canonical::{apartments, craigslist, resy};
use navgrade_core::{
    build_evaluator, decode_search_url, episode_span, load_manifest, replay_episode, scripts,
    BatchRunner, GraderSettings, ResultStore, TaskConfig, Trajectory, METRICS,
};

#[derive(Parser)]
#[command(name = "navgrade")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade web-agent trajectories against declarative goals", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "NAVGRADE_LOG_JSON")]
    json: bool,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "NAVGRADE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of extraction scripts overriding the embedded ones
    #[arg(long, global = true, env = "NAVGRADE_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,

    /// Maximum episodes graded at once
    #[arg(long, global = true, env = "NAVGRADE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Timeout for each update, in milliseconds
    #[arg(long, global = true, env = "NAVGRADE_UPDATE_TIMEOUT_MS")]
    update_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one recorded trajectory and print its result
    Grade {
        /// Task file (JSON)
        #[arg(short, long)]
        task: PathBuf,

        /// Trajectory file (JSONL, one step per line)
        #[arg(short = 'r', long)]
        trajectory: PathBuf,

        /// Also write the result here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Grade every episode in a manifest
    Batch {
        /// Manifest file (JSONL of task_id, task, trajectory)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory for per-task results; enables resume
        #[arg(long, env = "NAVGRADE_RESULTS_DIR")]
        results_dir: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        report_json: bool,
    },

    /// Summarize stored results by evaluator
    Summary {
        #[arg(long, env = "NAVGRADE_RESULTS_DIR")]
        results_dir: PathBuf,
    },

    /// Print the canonical form of a URL
    Canonicalize {
        #[arg(short, long, value_enum)]
        domain: Domain,

        url: String,

        /// Resy comparison keys
        #[arg(long, value_enum, default_value = "strict")]
        keys: Keys,
    },

    /// Decode a flight search results URL
    DecodeFlight { url: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Domain {
    Apartments,
    Craigslist,
    Resy,
}

#[derive(Clone, Copy, ValueEnum)]
enum Keys {
    Strict,
    Relaxed,
    WithoutTime,
}

impl From<Keys> for ResyMatchKeys {
    fn from(keys: Keys) -> Self {
        match keys {
            Keys::Strict => ResyMatchKeys::Strict,
            Keys::Relaxed => ResyMatchKeys::Relaxed,
            Keys::WithoutTime => ResyMatchKeys::WithoutTime,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    navgrade_core::init_tracing(cli.json || settings.log_json, level);

    match cli.command {
        Commands::Grade {
            task,
            trajectory,
            output,
        } => cmd_grade(&settings, &task, &trajectory, output.as_deref()).await,
        Commands::Batch {
            manifest,
            results_dir,
            report_json,
        } => cmd_batch(&settings, &manifest, results_dir, report_json).await,
        Commands::Summary { results_dir } => cmd_summary(&results_dir),
        Commands::Canonicalize { domain, url, keys } => cmd_canonicalize(domain, &url, keys),
        Commands::DecodeFlight { url } => cmd_decode_flight(&url),
    }
}

/// File settings, then flags and environment on top.
fn resolve_settings(cli: &Cli) -> Result<GraderSettings> {
    let mut settings = GraderSettings::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.scripts_dir {
        settings.scripts_dir = Some(dir.clone());
    }
    if let Some(n) = cli.concurrency {
        anyhow::ensure!(n > 0, "--concurrency must be at least 1");
        settings.concurrency = n;
    }
    if let Some(ms) = cli.update_timeout_ms {
        anyhow::ensure!(ms > 0, "--update-timeout-ms must be positive");
        settings.update_timeout_ms = ms;
    }
    Ok(settings)
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

async fn cmd_grade(
    settings: &GraderSettings,
    task_path: &Path,
    trajectory_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let scripts = scripts::init_global(settings.scripts_dir.as_deref())?;
    let task: TaskConfig = read_json_file(task_path)?;
    let trajectory = Trajectory::load(trajectory_path)?;
    let evaluator = build_evaluator(&task.eval_config, scripts)
        .with_context(|| format!("Invalid evaluator config in {:?}", task_path))?;

    let task_id = task_path.display().to_string();
    let (result, summary) = replay_episode(
        evaluator.as_ref(),
        &trajectory,
        Some(settings.update_timeout()),
    )
    .instrument(episode_span(&task_id))
    .await;
    info!(
        steps = summary.steps,
        failed = summary.failed,
        timed_out = summary.timed_out,
        "trajectory replayed"
    );

    let rendered = serde_json::to_string_pretty(&result)?;
    if let Some(path) = output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write result to {:?}", path))?;
        println!("Wrote result to {:?}", path);
    }
    println!("{rendered}");
    Ok(())
}

async fn cmd_batch(
    settings: &GraderSettings,
    manifest: &Path,
    results_dir: Option<PathBuf>,
    report_json: bool,
) -> Result<()> {
    let scripts = scripts::init_global(settings.scripts_dir.as_deref())?;
    let items = load_manifest(manifest)?;
    println!("Grading {} episodes from {:?}", items.len(), manifest);

    let mut runner = BatchRunner::new(settings.clone(), scripts.clone());
    if let Some(dir) = results_dir {
        runner = runner.with_store(ResultStore::new(dir));
    }
    let report = runner.run(items).await;

    if report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Run {}", report.run_id);
    let resumed = report.episodes.iter().filter(|e| e.resumed).count();
    println!("  episodes: {} ({} resumed)", report.episodes.len(), resumed);
    for (domain, summary) in &report.by_domain {
        println!(
            "  {:<30} n={:<5} mean={:.3} crashed={}",
            domain, summary.count, summary.mean_score, summary.crashed
        );
    }
    println!("  overall mean: {:.3}", report.mean_score());
    println!(
        "  updates applied={} failed={} discarded={} closures={}",
        METRICS.updates_applied(),
        METRICS.updates_failed(),
        METRICS.observations_discarded(),
        METRICS.closures_promoted()
    );
    Ok(())
}

fn cmd_summary(results_dir: &Path) -> Result<()> {
    if !results_dir.exists() {
        println!("No results found in {:?}", results_dir);
        return Ok(());
    }
    let episodes: Vec<EpisodeReport> = ResultStore::new(results_dir)
        .list()
        .with_context(|| format!("Failed to read results directory: {:?}", results_dir))?
        .into_iter()
        .map(|stored| EpisodeReport {
            task_id: stored.task_id,
            evaluator: stored.result.kind().to_string(),
            result: stored.result,
            resumed: true,
            replay: None,
        })
        .collect();

    if episodes.is_empty() {
        println!("No results found in {:?}", results_dir);
        return Ok(());
    }
    for (domain, summary) in summarize(&episodes) {
        println!(
            "{:<30} n={:<5} mean={:.3} crashed={}",
            domain, summary.count, summary.mean_score, summary.crashed
        );
    }
    Ok(())
}

fn cmd_canonicalize(domain: Domain, url: &str, keys: Keys) -> Result<()> {
    match domain {
        Domain::Apartments => println!("{}", apartments::canonicalize(url)),
        Domain::Craigslist => println!(
            "{}",
            serde_json::to_string_pretty(&craigslist::param_set(url))?
        ),
        Domain::Resy => println!("{}", resy::canonicalize(url, keys.into())),
    }
    Ok(())
}

fn cmd_decode_flight(url: &str) -> Result<()> {
    let query = decode_search_url(url).with_context(|| format!("Cannot decode {url}"))?;
    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}
