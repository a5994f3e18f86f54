//! Metric source boundary

use crate::error::FetchError;
use async_trait::async_trait;

/// Produces the current value of a metric query.
///
/// Implementations bound each call with their own timeout and must treat a
/// query matching more than one series as an error.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the current value for `query`
    async fn fetch(&self, query: &str) -> Result<f64, FetchError>;
}
