//! Demo CLI for the batch job orchestrator.
//!
//! Submits a batch of demo jobs against the in-memory reference transport,
//! waits for them to complete, and reports the outcome. Run it twice
//! against the same state directory: the second run submits nothing,
//! because every job name is already recorded as `SUCCEEDED`.

use std::path::PathBuf;
use std::sync::Arc;

use batch_api::MockTransport;
use batch_engine::store::StateStore;
use batch_engine::{BatchRunner, EngineConfig, Job, JsonStore, RateGate, RemoteApiAdapter, StateStoreConfig};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batch-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit and drive a batch of demo jobs to completion
    Run {
        /// Number of demo jobs to submit
        #[arg(short, long, default_value = "10")]
        count: u32,

        /// Directory holding the JSON job-state file
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run { count, state_dir } => run(count, state_dir).await,
        Commands::Version => {
            println!("batch-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(count: u32, state_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = EngineConfig {
        start_pause: 0.05,
        min_pause: 0.05,
        max_pause: 0.2,
        ..EngineConfig::default()
    };

    let store_path = match state_dir {
        Some(dir) => dir.join("jobs.json"),
        None => match &config.state_store {
            StateStoreConfig::JsonFile { path } => path.clone(),
            StateStoreConfig::Redis { .. } => {
                anyhow::bail!("demo CLI only supports the JSON file state store")
            }
        },
    };
    config.state_store = StateStoreConfig::JsonFile {
        path: store_path.clone(),
    };

    let store: Arc<dyn StateStore> = Arc::new(JsonStore::new(&store_path).await?);
    let transport = Arc::new(MockTransport::new());

    let demo_jobs: Vec<Job> = (0..count)
        .map(|i| Job::new(format!("demo-job-{i:04}"), "demo-queue", "demo-def"))
        .collect();

    let to_run = store.jobs_to_run(&demo_jobs).await?;
    let skipped = demo_jobs.len() - to_run.len();

    tracing::info!(
        requested = demo_jobs.len(),
        to_submit = to_run.len(),
        already_done = skipped,
        "filtered demo batch against state store"
    );

    let adapter = RemoteApiAdapter::new(transport, RateGate::new(config.gate_width), &config);
    let runner = BatchRunner::new(&adapter, store, &config);
    let outcomes = runner.run(to_run).await;

    let mut succeeded = 0;
    let mut failed = 0;
    for (job, result) in &outcomes {
        match result {
            Ok(Some(desc)) if desc.status == batch_api::JobStatus::Succeeded => succeeded += 1,
            Ok(Some(_)) => failed += 1,
            Ok(None) => tracing::warn!(job_name = %job.job_name, "waiter gave up without a terminal status"),
            Err(e) => tracing::error!(job_name = %job.job_name, error = %e, "job manager error"),
        }
    }

    println!(
        "{} submitted, {} already done, {} succeeded, {} failed (state: {})",
        outcomes.len(),
        skipped,
        succeeded,
        failed,
        store_path.display()
    );

    Ok(())
}
