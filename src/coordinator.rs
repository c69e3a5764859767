use std::collections::HashMap;
use std::sync::Arc;

use crate::arguments::validate_job_arguments;
use crate::context::RequestContext;
use crate::error::{JobDockError, Result};
use crate::executor::Executor;
use crate::registry::{validate_job_name, JobRegistry};

/// Terminal status returned to the caller of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    pub status: String,
}

/// Turns an execution request into an executor dispatch.
///
/// The job is looked up in the registry on every call; a lookup failure is
/// returned as-is and the executor is never reached. Executions are never
/// retried here since jobs are not assumed to be idempotent.
pub struct ExecutionCoordinator {
    registry: Arc<JobRegistry>,
    executor: Arc<dyn Executor>,
}

impl ExecutionCoordinator {
    pub fn new(registry: Arc<JobRegistry>, executor: Arc<dyn Executor>) -> Self {
        Self { registry, executor }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        job_name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<ExecutionResponse> {
        validate_job_name(job_name)?;
        validate_job_arguments(&arguments)?;

        let metadata = self.registry.fetch(ctx, job_name).await?;
        if metadata.image_reference.is_empty() {
            return Err(JobDockError::Internal(format!(
                "job {} has no image reference",
                job_name
            )));
        }

        tracing::info!(
            job = job_name,
            image = %metadata.image_reference,
            arguments = arguments.len(),
            "Dispatching job"
        );

        let status = ctx
            .guard(
                self.executor
                    .run(job_name, &metadata.image_reference, &arguments),
            )
            .await?
            .map_err(|source| {
                tracing::error!(job = job_name, error = %source, "Job execution failed");
                JobDockError::Executor {
                    job: job_name.to_string(),
                    source,
                }
            })?;

        tracing::info!(job = job_name, status = %status, "Job finished");
        Ok(ExecutionResponse { status })
    }
}
