use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use super::{ExecutionStatus, Executor, ExecutorError};
use crate::arguments::is_valid_argument_name;
use crate::config::SandboxConfig;

/// Runs job images in Docker containers with security isolation.
///
/// Every run gets a fresh `--rm` container with:
/// - Network isolation (disabled by default)
/// - Dropped capabilities
/// - Read-only root filesystem
/// - Memory and CPU limits
///
/// Job arguments are passed as environment variables. A non-zero exit is a
/// `failed` status, not an error; errors are reserved for runs that could not
/// be launched or did not finish in time.
///
/// A run that times out, or whose future is dropped before the container
/// exits, is followed by `docker kill` on the container. Killing the local
/// CLI process alone leaves the container running on the daemon.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    config: SandboxConfig,
}

impl DockerExecutor {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the docker binary for one run.
    pub fn docker_args(
        &self,
        container_name: &str,
        image: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<Vec<String>, ExecutorError> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            format!("--name={}", container_name),
        ];

        // Network isolation
        if self.config.network_disabled {
            args.push("--network=none".to_string());
        }

        // Memory limit
        if let Some(ref limit) = self.config.memory_limit {
            args.push(format!("--memory={}", limit));
        }

        // CPU limit
        if let Some(ref limit) = self.config.cpu_limit {
            args.push(format!("--cpus={}", limit));
        }

        // Security: drop all capabilities, no new privileges
        args.push("--cap-drop=ALL".to_string());
        args.push("--security-opt=no-new-privileges".to_string());

        // Read-only root filesystem
        args.push("--read-only".to_string());

        // Sorted so the command line is stable across runs
        let sorted: BTreeMap<&String, &String> = arguments.iter().collect();
        for (key, value) in sorted {
            if !is_valid_argument_name(key) {
                return Err(ExecutorError::InvalidArgument(format!(
                    "{:?} is not a valid environment variable name",
                    key
                )));
            }
            args.push("--env".to_string());
            args.push(format!("{}={}", key, value));
        }

        args.push(image.to_string());
        Ok(args)
    }

    fn process_output(job_name: &str, output: std::process::Output) -> ExecutionStatus {
        let exit_code = output.status.code();

        if output.status.success() {
            tracing::info!(job = job_name, exit_code = ?exit_code, "Job completed");
            ExecutionStatus::Completed
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                job = job_name,
                exit_code = ?exit_code,
                stderr = %stderr.trim(),
                "Job failed"
            );
            ExecutionStatus::Failed
        }
    }
}

#[async_trait]
impl Executor for DockerExecutor {
    async fn run(
        &self,
        job_name: &str,
        image: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, ExecutorError> {
        let container_name = format!("jobdock-{}", Uuid::new_v4());
        let args = self.docker_args(&container_name, image, arguments)?;

        tracing::info!(
            job = job_name,
            image,
            container = %container_name,
            "Executing job"
        );

        let child = Command::new(&self.config.docker_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let mut guard = ContainerGuard::new(&self.config.docker_binary, &container_name);
        let result = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(job = job_name, container = %container_name, "Job timed out");
                    guard.disarm();
                    kill_container(&self.config.docker_binary, &container_name).await;
                    return Err(ExecutorError::TimedOut(limit));
                }
            },
            None => child.await,
        };
        guard.disarm();
        let output = result?;

        Ok(Self::process_output(job_name, output).to_string())
    }
}

/// Stops the named container if dropped while still armed.
struct ContainerGuard {
    docker_binary: PathBuf,
    container_name: String,
    armed: bool,
}

impl ContainerGuard {
    fn new(docker_binary: &Path, container_name: &str) -> Self {
        Self {
            docker_binary: docker_binary.to_path_buf(),
            container_name: container_name.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                container = %self.container_name,
                "No runtime to stop abandoned container"
            );
            return;
        };

        let docker_binary = std::mem::take(&mut self.docker_binary);
        let container_name = std::mem::take(&mut self.container_name);
        tracing::warn!(container = %container_name, "Run abandoned, stopping container");
        handle.spawn(async move {
            kill_container(&docker_binary, &container_name).await;
        });
    }
}

async fn kill_container(docker_binary: &Path, container_name: &str) {
    let result = Command::new(docker_binary)
        .arg("kill")
        .arg(container_name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => {
            tracing::info!(container = container_name, "Container stopped");
        }
        Ok(status) => {
            // Usually the container already exited and was removed
            tracing::debug!(
                container = container_name,
                exit_code = ?status.code(),
                "docker kill did not succeed"
            );
        }
        Err(e) => {
            tracing::warn!(container = container_name, error = %e, "Failed to run docker kill");
        }
    }
}
