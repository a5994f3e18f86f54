//! # Stand CLI
//!
//! Runs a soak test against a Docker Compose environment and stops early
//! when a Prometheus metric crosses its ceiling.
//!
//! ## Usage
//!
//! ```bash
//! stand run --config stand.toml --duration 600 --output report.json
//! stand check --config stand.toml
//! stand probe --config stand.toml
//! ```

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use stand_core::{Gather, Gatherer, Reporter};
use stand_runner::app::{self, EXIT_PASSED, EXIT_STOPPED};
use stand_runner::{Overrides, PrometheusSource, StandConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code for configuration and lifecycle failures
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "stand")]
#[command(version)]
#[command(about = "Threshold-guarded soak test runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "stand.toml")]
    config: PathBuf,

    /// Monitoring backend URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Warm-up after start, in seconds
    #[arg(long)]
    start_delay: Option<u64>,

    /// Test duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Poll interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<StandConfig> {
        let mut config = StandConfig::load(&self.config)?;
        config.apply_overrides(&Overrides {
            endpoint: self.endpoint.clone(),
            start_delay_secs: self.start_delay,
            test_duration_secs: self.duration,
            poll_interval_secs: self.interval,
        });
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the environment, sample until deadline or breach, tear down
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Write the report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the configuration without touching the environment
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Gather one batch from the backend without starting the environment
    Probe {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn run(config: StandConfig, output: Option<PathBuf>) -> anyhow::Result<i32> {
    app::log_settings(&config);

    let reporter = Arc::new(Reporter::new());
    let mut scheduler = app::production_scheduler(&config, reporter.clone())?;
    let mut interrupt = app::spawn_interrupt_listener(scheduler.stop_handle());

    let outcome = tokio::select! {
        outcome = app::execute(&mut scheduler, &reporter) => outcome,
        _ = &mut interrupt => anyhow::bail!(
            "run abandoned; the environment in {} may still be up",
            config.work_dir.display()
        ),
    };
    interrupt.abort();
    let outcome = outcome?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&reporter.to_report())?;
        std::fs::write(&path, json)
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        info!("Report saved to {}", path.display());
    }

    Ok(app::exit_code(&outcome))
}

async fn probe(config: StandConfig) -> anyhow::Result<i32> {
    let source = PrometheusSource::new(config.endpoint.clone())?;
    let gatherer = Gatherer::new(config.metrics.clone(), Arc::new(source));

    let (batch, ok) = gatherer.gather_and_check(Utc::now()).await;
    println!("{}", batch);

    Ok(if ok { EXIT_PASSED } else { EXIT_STOPPED })
}

async fn dispatch(command: Commands) -> anyhow::Result<i32> {
    match command {
        Commands::Run { config, output } => run(config.load()?, output).await,
        Commands::Check { config } => {
            let config = config.load()?;
            app::log_settings(&config);
            println!("config ok: {} metrics", config.metrics.len());
            Ok(EXIT_PASSED)
        }
        Commands::Probe { config } => probe(config.load()?).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}
