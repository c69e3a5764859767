//! Execution backends that actually run a job's container image.
//!
//! The coordinator only sees the [`Executor`] trait: hand it a job name, an
//! image reference and the caller's arguments, get back a terminal status
//! token or an error. How the image gets scheduled is up to the backend.
//!
//! - [`DockerExecutor`]: runs the image through the local `docker` CLI in a
//!   sandboxed, throwaway container

pub mod docker;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use docker::DockerExecutor;

/// Terminal outcome reported by the built-in executors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("failed to launch container: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("job did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("invalid job argument: {0}")]
    InvalidArgument(String),

    #[error("executor backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `image` for `job_name` with `arguments` and wait for a terminal
    /// status. Implementations must not retry on their own behalf unless the
    /// backend knows the job is idempotent.
    async fn run(
        &self,
        job_name: &str,
        image: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, ExecutorError>;
}
