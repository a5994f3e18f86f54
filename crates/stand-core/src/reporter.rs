//! Append-only sample log and the final report

use crate::types::{Batch, StopReason};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

const REPORT_HEADER: &str = "=[ report ]==================";
const REPORT_FOOTER: &str = "=[ end ]=====================";

/// Serializable form of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub reason: Option<StopReason>,
    pub ticks: usize,
    pub batches: Vec<Batch>,
}

/// Records every gathered batch in tick order
#[derive(Debug, Default)]
pub struct Reporter {
    log: RwLock<Vec<Batch>>,
    reason: RwLock<Option<StopReason>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch to the log
    pub fn record(&self, batch: Batch) {
        self.log.write().push(batch);
    }

    /// Attach the reason the run stopped
    pub fn set_stop_reason(&self, reason: StopReason) {
        *self.reason.write() = Some(reason);
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason.read().clone()
    }

    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    /// Snapshot of the log
    pub fn batches(&self) -> Vec<Batch> {
        self.log.read().clone()
    }

    /// Render the log, one line per batch
    pub fn dump(&self) -> Vec<String> {
        let log = self.log.read();
        let mut lines = Vec::with_capacity(log.len() + 3);
        lines.push(REPORT_HEADER.to_string());
        lines.extend(log.iter().map(|batch| format!("  {}", batch)));
        if let Some(reason) = self.reason.read().as_ref() {
            lines.push(format!("  stop reason: {}", reason));
        }
        lines.push(REPORT_FOOTER.to_string());
        lines
    }

    pub fn to_report(&self) -> RunReport {
        let batches = self.batches();
        RunReport {
            reason: self.stop_reason(),
            ticks: batches.len(),
            batches,
        }
    }
}
