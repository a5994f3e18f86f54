//! Wiring a run together and driving it to completion

use crate::compose::DockerCompose;
use crate::config::StandConfig;
use crate::prometheus::PrometheusSource;
use stand_core::prelude::*;
use stand_core::ConfigError;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Exit code for a run that reached its deadline
pub const EXIT_PASSED: i32 = 0;

/// Exit code for a run stopped by a breach or interrupt
pub const EXIT_STOPPED: i32 = 1;

/// Assemble a scheduler around the given collaborators
pub fn build_scheduler(
    config: &StandConfig,
    source: Arc<dyn MetricSource>,
    env: Arc<dyn EnvManager>,
    reporter: Arc<Reporter>,
) -> Scheduler {
    let handle = StopHandle::new();
    let gatherer = Gatherer::new(config.metrics.clone(), source);
    let eventer = Eventer::new(gatherer, reporter, handle.clone());
    Scheduler::new(config.run_settings(), env, Box::new(eventer), handle)
}

/// Scheduler backed by Prometheus and Docker Compose
pub fn production_scheduler(
    config: &StandConfig,
    reporter: Arc<Reporter>,
) -> std::result::Result<Scheduler, ConfigError> {
    let source = PrometheusSource::new(config.endpoint.clone())
        .map_err(|e| ConfigError::Invalid(format!("metric source: {}", e)))?;
    let env = DockerCompose::with_program(config.work_dir.clone(), config.compose_program.clone());
    Ok(build_scheduler(config, Arc::new(source), Arc::new(env), reporter))
}

/// Log the resolved settings before anything is touched
pub fn log_settings(config: &StandConfig) {
    info!("=[ info ]==============================");
    info!("     endpoint: {}", config.endpoint);
    info!("      workDir: {}", config.work_dir.display());
    info!("   startDelay: {}s", config.start_delay_secs);
    info!(" testDuration: {}s", config.test_duration_secs);
    info!(" pollInterval: {}s", config.poll_interval_secs);
    for metric in &config.metrics {
        info!("       metric: {} <= {} ({})", metric.name, metric.ceiling, metric.query);
    }
}

/// Init, run, tear down, report.
///
/// A lifecycle error ends the run immediately and no report is emitted.
pub async fn execute(scheduler: &mut Scheduler, reporter: &Reporter) -> Result<RunOutcome> {
    info!("=[ init ]==============================");
    scheduler.init().await?;

    let outcome = scheduler.run().await;

    scheduler.down().await?;

    if let Some(reason) = outcome.reason.clone() {
        reporter.set_stop_reason(reason);
    }
    for line in reporter.dump() {
        info!("{}", line);
    }

    Ok(outcome)
}

/// Interrupt the run when the operator hits Ctrl-C.
///
/// The first press stops the run at its next check, or right after
/// start-up if the environment is still coming up. The task only finishes
/// on a second press, which tells the caller to abandon the run.
pub fn spawn_interrupt_listener(handle: StopHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for interrupts: {}", e);
                return std::future::pending::<()>().await;
            }
            if handle.interrupt() {
                warn!("interrupt received, stopping after the current tick");
            } else {
                warn!("interrupt received again, abandoning the run");
                return;
            }
        }
    })
}

pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome.reason {
        Some(StopReason::Deadline) => EXIT_PASSED,
        _ => EXIT_STOPPED,
    }
}
