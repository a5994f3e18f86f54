//! Docker Compose environment lifecycle

use async_trait::async_trait;
use stand_core::{EnvError, EnvManager};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

const UP_ARGS: &[&str] = &["compose", "up", "-d", "--remove-orphans"];
const DOWN_ARGS: &[&str] = &["compose", "down"];

/// Runs `docker compose` in the project directory
#[derive(Debug, Clone)]
pub struct DockerCompose {
    work_dir: PathBuf,
    program: String,
}

impl DockerCompose {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_program(work_dir, "docker")
    }

    pub fn with_program(work_dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            program: program.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn invoke(&self, what: &str, args: &[&str]) -> Result<(), EnvError> {
        let command = format!("{} {}", self.program, args.join(" "));
        info!("{} stand: {} (in {})", what, command, self.work_dir.display());

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|source| EnvError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EnvError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EnvManager for DockerCompose {
    async fn start(&self) -> Result<(), EnvError> {
        self.invoke("start", UP_ARGS).await
    }

    async fn stop(&self) -> Result<(), EnvError> {
        self.invoke("stop", DOWN_ARGS).await
    }
}
