//! # Stand Runner
//!
//! Concrete collaborators and wiring for threshold-guarded soak runs:
//!
//! - **Prometheus**: metric readings via the instant-query HTTP API
//! - **Docker Compose**: environment bring-up and tear-down
//! - **Config**: TOML run description
//!
//! ## Usage
//!
//! ```bash
//! # Full run: compose up, sample until deadline or breach, compose down
//! stand run --config stand.toml
//!
//! # Validate the config without touching the environment
//! stand check --config stand.toml
//!
//! # Sample once against the live backend
//! stand probe --config stand.toml
//! ```

pub mod app;
pub mod compose;
pub mod config;
pub mod prometheus;

pub use app::{build_scheduler, execute, production_scheduler};
pub use compose::DockerCompose;
pub use config::{Overrides, StandConfig};
pub use prometheus::PrometheusSource;
