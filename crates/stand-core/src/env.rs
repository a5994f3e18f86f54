//! Environment lifecycle boundary

use crate::error::EnvError;
use async_trait::async_trait;

/// Brings the environment under test up and down.
///
/// Errors are never retried by the scheduler.
#[async_trait]
pub trait EnvManager: Send + Sync {
    /// Bring the environment to a ready state
    async fn start(&self) -> Result<(), EnvError>;

    /// Tear the environment down
    async fn stop(&self) -> Result<(), EnvError>;
}
