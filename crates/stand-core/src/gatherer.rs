//! Gathering a batch of readings and checking it against ceilings

use crate::source::MetricSource;
use crate::types::{Batch, MetricDefinition, MetricReading, Sample};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something that can produce one checked batch per tick
#[async_trait]
pub trait Gather: Send + Sync {
    /// Gather every metric and report whether all are within their ceiling
    async fn gather_and_check(&self, now: DateTime<Utc>) -> (Batch, bool);
}

/// Fetches a fixed, ordered list of metrics from one source
pub struct Gatherer {
    metrics: Vec<MetricDefinition>,
    source: Arc<dyn MetricSource>,
}

impl Gatherer {
    pub fn new(metrics: Vec<MetricDefinition>, source: Arc<dyn MetricSource>) -> Self {
        Self { metrics, source }
    }

    async fn read(&self, metric: &MetricDefinition) -> MetricReading {
        let sample = match self.source.fetch(&metric.query).await {
            Ok(value) => Sample::Value(value),
            Err(e) => {
                warn!("metric {} could not be fetched: {}", metric.name, e);
                Sample::Failed(e.to_string())
            }
        };
        MetricReading {
            name: metric.name.clone(),
            ceiling: metric.ceiling,
            sample,
        }
    }
}

#[async_trait]
impl Gather for Gatherer {
    async fn gather_and_check(&self, now: DateTime<Utc>) -> (Batch, bool) {
        // join_all keeps input order, so readings stay in configuration order
        let readings = join_all(self.metrics.iter().map(|m| self.read(m))).await;

        let mut ok = true;
        for reading in &readings {
            if !reading.within_ceiling() {
                warn!(
                    "metric({}): {} > {}",
                    reading.name, reading.sample, reading.ceiling
                );
                ok = false;
            }
        }

        debug!("gathered {} readings, within ceiling: {}", readings.len(), ok);
        (
            Batch {
                timestamp: now,
                readings,
            },
            ok,
        )
    }
}
