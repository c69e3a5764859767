use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jobdock::config::SandboxConfig;
use jobdock::context::RequestContext;
use jobdock::error::JobDockError;
use jobdock::executor::{DockerExecutor, ExecutionStatus, Executor, ExecutorError};
use tempfile::TempDir;

/// Write an executable stand-in for the docker CLI.
fn fake_docker(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("docker");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake docker that logs each invocation, exits at once for `kill` and
/// otherwise runs for a while.
fn logging_docker(dir: &TempDir, run_body: &str) -> (PathBuf, PathBuf) {
    let log = dir.path().join("calls.log");
    let script = format!(
        "echo \"$@\" >> '{}'\nif [ \"$1\" = \"kill\" ]; then exit 0; fi\n{}",
        log.display(),
        run_body
    );
    (fake_docker(dir, &script), log)
}

fn logged_calls(log: &Path) -> Vec<String> {
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Name passed as `--name=` on the logged `run` call.
fn container_name(calls: &[String]) -> String {
    calls
        .iter()
        .find(|c| c.starts_with("run "))
        .and_then(|c| c.split(' ').find_map(|a| a.strip_prefix("--name=")))
        .map(str::to_string)
        .expect("run call should be logged")
}

async fn wait_for_kill(log: &Path) -> Vec<String> {
    for _ in 0..100 {
        let calls = logged_calls(log);
        if calls.iter().any(|c| c.starts_with("kill ")) {
            return calls;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    logged_calls(log)
}

fn executor_with(docker_binary: PathBuf, timeout: Option<Duration>) -> DockerExecutor {
    DockerExecutor::new(SandboxConfig {
        docker_binary,
        timeout,
        ..SandboxConfig::default()
    })
}

#[tokio::test]
async fn test_successful_run_is_completed() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(fake_docker(&dir, "exit 0"), None);

    let status = executor
        .run("resize", "img/resize", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(status, ExecutionStatus::Completed.to_string());
}

#[tokio::test]
async fn test_nonzero_exit_is_failed_status() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(fake_docker(&dir, "echo 'error message' >&2; exit 3"), None);

    let status = executor
        .run("resize", "img/resize", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(status, "failed");
}

#[tokio::test]
async fn test_arguments_reach_docker_command_line() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("args.log");
    let script = format!("printf '%s\\n' \"$@\" > '{}'", log.display());
    let executor = executor_with(fake_docker(&dir, &script), None);

    let arguments = HashMap::from([("width".to_string(), "100".to_string())]);
    executor
        .run("resize", "img/resize", &arguments)
        .await
        .unwrap();

    let logged = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = logged.lines().collect();
    assert_eq!(lines.first(), Some(&"run"));
    assert!(lines.contains(&"--rm"));
    assert!(lines.contains(&"width=100"));
    assert_eq!(lines.last(), Some(&"img/resize"));
}

#[tokio::test]
async fn test_missing_binary_is_spawn_error() {
    let executor = executor_with(PathBuf::from("/nonexistent/docker-12345"), None);

    let result = executor.run("resize", "img/resize", &HashMap::new()).await;
    assert!(matches!(result, Err(ExecutorError::Spawn(_))));
}

#[tokio::test]
async fn test_slow_run_times_out() {
    let dir = TempDir::new().unwrap();
    let executor = executor_with(
        logging_docker(&dir, "sleep 5").0,
        Some(Duration::from_millis(100)),
    );

    let result = executor.run("resize", "img/resize", &HashMap::new()).await;
    assert!(matches!(result, Err(ExecutorError::TimedOut(d)) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn test_invalid_argument_name_is_rejected_before_launch() {
    let executor = executor_with(PathBuf::from("/nonexistent/docker-12345"), None);
    let arguments = HashMap::from([("a=b".to_string(), "1".to_string())]);

    let result = executor.run("resize", "img/resize", &arguments).await;
    assert!(matches!(result, Err(ExecutorError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_timed_out_run_kills_its_container() {
    let dir = TempDir::new().unwrap();
    let (docker, log) = logging_docker(&dir, "sleep 5");
    let executor = executor_with(docker, Some(Duration::from_millis(300)));

    let result = executor.run("resize", "img/resize", &HashMap::new()).await;
    assert!(matches!(result, Err(ExecutorError::TimedOut(_))));

    let calls = logged_calls(&log);
    let name = container_name(&calls);
    assert!(name.starts_with("jobdock-"));
    assert!(calls.contains(&format!("kill {}", name)));
}

#[tokio::test]
async fn test_abandoned_run_kills_its_container() {
    let dir = TempDir::new().unwrap();
    let (docker, log) = logging_docker(&dir, "sleep 5");
    let executor = executor_with(docker, None);

    let ctx = RequestContext::new().with_timeout(Duration::from_millis(300));
    let result = ctx
        .guard(executor.run("resize", "img/resize", &HashMap::new()))
        .await;
    assert!(matches!(result, Err(JobDockError::DeadlineExceeded)));

    let calls = wait_for_kill(&log).await;
    let name = container_name(&calls);
    assert!(calls.contains(&format!("kill {}", name)));
}

#[tokio::test]
async fn test_finished_run_does_not_kill_container() {
    let dir = TempDir::new().unwrap();
    let (docker, log) = logging_docker(&dir, "exit 0");
    let executor = executor_with(docker, Some(Duration::from_secs(5)));

    let status = executor
        .run("resize", "img/resize", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(status, "completed");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls = logged_calls(&log);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("run "));
}
