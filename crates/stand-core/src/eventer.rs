//! Per-tick unit of work

use crate::control::StopHandle;
use crate::gatherer::Gather;
use crate::reporter::Reporter;
use crate::types::StopReason;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Work performed by the scheduler on every tick
#[async_trait]
pub trait RunEvent: Send + Sync {
    async fn fire(&self, now: DateTime<Utc>);
}

/// Gathers a batch, records it, and requests a stop when it breached
pub struct Eventer<G> {
    gatherer: G,
    reporter: Arc<Reporter>,
    stopper: StopHandle,
}

impl<G: Gather> Eventer<G> {
    pub fn new(gatherer: G, reporter: Arc<Reporter>, stopper: StopHandle) -> Self {
        Self {
            gatherer,
            reporter,
            stopper,
        }
    }
}

#[async_trait]
impl<G: Gather> RunEvent for Eventer<G> {
    async fn fire(&self, now: DateTime<Utc>) {
        let (batch, ok) = self.gatherer.gather_and_check(now).await;
        let breaches = if ok { Vec::new() } else { batch.breaches() };

        // The batch must be in the log before any stop is requested
        self.reporter.record(batch);

        if !ok {
            self.stopper
                .request_stop(StopReason::Breach { metrics: breaches });
        }
    }
}
