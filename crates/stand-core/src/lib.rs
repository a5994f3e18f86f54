//! # Stand Core
//!
//! Run scheduler for threshold-guarded soak tests.
//!
//! A run brings an environment up, samples a fixed set of metrics at a
//! fixed interval, and stops early the first time any metric exceeds its
//! ceiling. Every sample ends up in the report.
//!
//! ```text
//!   Scheduler ──init──► EnvManager::start
//!       │
//!       │ every poll interval, until deadline or stop request
//!       ▼
//!   Eventer::fire ──► Gatherer ──► MetricSource::fetch (per metric)
//!       │
//!       ├──► Reporter::record(batch)
//!       └──► StopHandle::request_stop (on breach)
//!       │
//!   Scheduler ──down──► EnvManager::stop ──► Reporter::dump
//! ```

pub mod control;
pub mod env;
pub mod error;
pub mod eventer;
pub mod gatherer;
pub mod reporter;
pub mod scheduler;
pub mod source;
pub mod types;

pub use control::{RunState, StopHandle};
pub use env::EnvManager;
pub use error::*;
pub use eventer::{Eventer, RunEvent};
pub use gatherer::{Gather, Gatherer};
pub use reporter::{Reporter, RunReport};
pub use scheduler::{RunOutcome, RunSettings, Scheduler};
pub use source::MetricSource;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::control::{RunState, StopHandle};
    pub use crate::env::EnvManager;
    pub use crate::error::{EnvError, FetchError, Result, StandError};
    pub use crate::eventer::{Eventer, RunEvent};
    pub use crate::gatherer::{Gather, Gatherer};
    pub use crate::reporter::Reporter;
    pub use crate::scheduler::{RunOutcome, RunSettings, Scheduler};
    pub use crate::source::MetricSource;
    pub use crate::types::*;
}
