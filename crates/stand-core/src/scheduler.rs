//! Run scheduler
//!
//! Drives one run: environment bring-up, start delay, ticking at a fixed
//! interval until either the deadline passes or a stop is requested, then
//! tear-down. The deadline and the stop flag are both checked at the top of
//! each iteration, so a run overruns its deadline by at most one tick.

use crate::control::{RunState, StopHandle};
use crate::env::EnvManager;
use crate::error::{ConfigError, EnvError, Result};
use crate::eventer::RunEvent;
use crate::types::StopReason;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Timing of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Warm-up after the environment starts; not part of the test duration
    pub start_delay: Duration,

    /// Hard upper bound on the ticking phase
    pub test_duration: Duration,

    /// Pause between ticks
    pub poll_interval: Duration,
}

impl RunSettings {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a finished run looked like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Ticks executed
    pub ticks: usize,
    /// Why the loop ended; `None` only if the run was never started
    pub reason: Option<StopReason>,
}

pub struct Scheduler {
    settings: RunSettings,
    env: Arc<dyn EnvManager>,
    event: Box<dyn RunEvent>,
    handle: StopHandle,
    ticks: usize,
    torn_down: bool,
}

impl Scheduler {
    pub fn new(
        settings: RunSettings,
        env: Arc<dyn EnvManager>,
        event: Box<dyn RunEvent>,
        handle: StopHandle,
    ) -> Self {
        Self {
            settings,
            env,
            event,
            handle,
            ticks: 0,
            torn_down: false,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn state(&self) -> RunState {
        self.handle.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.handle.clone()
    }

    /// Start the environment and enter Running
    pub async fn init(&self) -> Result<()> {
        if self.state() != RunState::NotStarted {
            return Err(EnvError::InvalidTransition("started").into());
        }
        info!("starting environment");
        self.env.start().await?;
        self.handle.mark_running();
        if self.state() == RunState::StopRequested {
            warn!("interrupted during start-up, skipping the run");
        }
        Ok(())
    }

    /// Request an early stop; no-op unless Running
    pub fn request_stop(&self, reason: StopReason) -> bool {
        self.handle.request_stop(reason)
    }

    /// Fire one event if Running. Returns whether it fired.
    pub async fn tick(&mut self) -> bool {
        if !self.handle.is_running() {
            return false;
        }
        self.ticks += 1;
        debug!("tick {}", self.ticks);
        self.event.fire(Utc::now()).await;
        true
    }

    /// Run the ticking loop until the deadline or a stop request.
    ///
    /// Does nothing unless Running, so a run interrupted during start-up
    /// goes straight to tear-down. The caller must call
    /// [`Scheduler::down`] afterwards whichever way the loop ended.
    pub async fn run(&mut self) -> RunOutcome {
        if self.handle.is_running() {
            self.gather_until_deadline().await;
        } else {
            info!("=[ skip ] run is {:?}", self.state());
        }

        let reason = self.handle.reason();
        if self.state() != RunState::NotStarted {
            self.handle.mark_stopped();
        }
        info!("=[ stop ] after {} ticks", self.ticks);

        RunOutcome {
            ticks: self.ticks,
            reason,
        }
    }

    async fn gather_until_deadline(&mut self) {
        info!("=[ delay {:?} ]", self.settings.start_delay);
        sleep(self.settings.start_delay).await;

        info!("=[ start gathers ]");
        let deadline = Instant::now() + self.settings.test_duration;

        loop {
            let now = Instant::now();
            if now >= deadline {
                info!("=[ timeout ]");
                self.handle.record_deadline();
                break;
            }
            if !self.handle.is_running() {
                break;
            }

            self.tick().await;

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.settings.poll_interval.min(remaining)).await;
        }
    }

    /// Tear the environment down. Only the first call reaches the
    /// environment.
    pub async fn down(&mut self) -> Result<()> {
        self.handle.mark_stopped();
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        info!("stopping environment");
        self.env.stop().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeEnv {
        started: AtomicUsize,
        stopped: AtomicUsize,
        fail_start: bool,
    }

    #[async_trait]
    impl EnvManager for FakeEnv {
        async fn start(&self) -> std::result::Result<(), EnvError> {
            if self.fail_start {
                return Err(EnvError::CommandFailed {
                    command: "up".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                });
            }
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> std::result::Result<(), EnvError> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Counts fires; optionally requests a stop on the nth fire
    struct FakeEvent {
        fired: Arc<AtomicUsize>,
        stop_on: Option<usize>,
        stopper: StopHandle,
    }

    #[async_trait]
    impl RunEvent for FakeEvent {
        async fn fire(&self, _now: DateTime<Utc>) {
            let n = self.fired.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.stop_on {
                self.stopper.request_stop(StopReason::Breach {
                    metrics: vec!["latency".to_string()],
                });
            }
        }
    }

    fn settings(duration: u64, interval: u64) -> RunSettings {
        RunSettings {
            start_delay: Duration::from_secs(0),
            test_duration: Duration::from_secs(duration),
            poll_interval: Duration::from_secs(interval),
        }
    }

    fn build(
        settings: RunSettings,
        env: Arc<FakeEnv>,
        stop_on: Option<usize>,
    ) -> (Scheduler, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = StopHandle::new();
        let event = FakeEvent {
            fired: fired.clone(),
            stop_on,
            stopper: handle.clone(),
        };
        (
            Scheduler::new(settings, env, Box::new(event), handle),
            fired,
        )
    }

    #[tokio::test]
    async fn test_init_and_down() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, _) = build(settings(1, 1), env.clone(), None);

        scheduler.init().await.unwrap();
        assert_eq!(scheduler.state(), RunState::Running);

        scheduler.down().await.unwrap();
        scheduler.down().await.unwrap();
        assert_eq!(scheduler.state(), RunState::Stopped);
        assert_eq!(env.started.load(Ordering::SeqCst), 1);
        assert_eq!(env.stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let env = Arc::new(FakeEnv::default());
        let (scheduler, _) = build(settings(1, 1), env.clone(), None);

        scheduler.init().await.unwrap();
        assert!(scheduler.init().await.is_err());
        assert_eq!(env.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_start_stays_not_started() {
        let env = Arc::new(FakeEnv {
            fail_start: true,
            ..Default::default()
        });
        let (mut scheduler, fired) = build(settings(1, 1), env, None);

        assert!(scheduler.init().await.is_err());
        assert_eq!(scheduler.state(), RunState::NotStarted);
        assert!(!scheduler.tick().await);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tick_only_while_running() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, fired) = build(settings(1, 1), env, None);

        assert!(!scheduler.tick().await);
        scheduler.init().await.unwrap();
        assert!(scheduler.tick().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(scheduler.request_stop(StopReason::Interrupted));
        assert!(!scheduler.request_stop(StopReason::Interrupted));
        assert!(!scheduler.tick().await);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), RunState::StopRequested);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_no_ticks() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, fired) = build(settings(0, 1), env, None);
        scheduler.init().await.unwrap();

        let outcome = scheduler.run().await;

        assert_eq!(outcome.ticks, 0);
        assert_eq!(outcome.reason, Some(StopReason::Deadline));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_tick_count() {
        for (duration, interval, expected) in [(1, 1, 1), (3, 1, 3), (10, 2, 5), (5, 2, 3)] {
            let env = Arc::new(FakeEnv::default());
            let (mut scheduler, fired) = build(settings(duration, interval), env, None);
            scheduler.init().await.unwrap();

            let outcome = scheduler.run().await;

            assert_eq!(outcome.ticks, expected, "duration {} interval {}", duration, interval);
            assert_eq!(fired.load(Ordering::SeqCst), expected);
            assert_eq!(outcome.reason, Some(StopReason::Deadline));
            assert_eq!(scheduler.state(), RunState::Stopped);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_request_ends_loop_before_deadline() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, fired) = build(settings(10, 1), env, Some(1));
        scheduler.init().await.unwrap();

        let started = Instant::now();
        let outcome = scheduler.run().await;

        assert_eq!(outcome.ticks, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.reason, Some(StopReason::Breach { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_delay_not_counted() {
        let env = Arc::new(FakeEnv::default());
        let mut run = settings(2, 1);
        run.start_delay = Duration::from_secs(30);
        let (mut scheduler, _) = build(run, env, None);
        scheduler.init().await.unwrap();

        let started = Instant::now();
        let outcome = scheduler.run().await;

        assert_eq!(outcome.ticks, 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(32) && elapsed < Duration::from_secs(33));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_init_does_nothing() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, fired) = build(settings(3, 1), env, None);

        let outcome = scheduler.run().await;

        assert_eq!(outcome.ticks, 0);
        assert_eq!(outcome.reason, None);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_init_records_no_deadline() {
        let env = Arc::new(FakeEnv::default());
        let (mut scheduler, _) = build(settings(0, 1), env, None);

        let outcome = scheduler.run().await;

        assert_eq!(outcome.reason, None);
        assert_eq!(scheduler.state(), RunState::NotStarted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_init_skips_run() {
        let env = Arc::new(FakeEnv::default());
        let mut run = settings(100, 1);
        run.start_delay = Duration::from_secs(30);
        let (mut scheduler, fired) = build(run, env.clone(), None);

        assert!(scheduler.stop_handle().interrupt());
        scheduler.init().await.unwrap();
        assert_eq!(scheduler.state(), RunState::StopRequested);

        let started = Instant::now();
        let outcome = scheduler.run().await;

        assert_eq!(outcome.ticks, 0);
        assert_eq!(outcome.reason, Some(StopReason::Interrupted));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);

        scheduler.down().await.unwrap();
        assert_eq!(env.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(settings(10, 0).validate().is_err());
        assert!(settings(10, 1).validate().is_ok());
    }
}
