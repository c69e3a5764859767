use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use crate::context::RequestContext;
use crate::coordinator::ExecutionCoordinator;
use crate::proto::job_service_server::JobService;
use crate::proto::{
    ExecuteJobRequest, ExecuteJobResponse, GetAvailableJobsRequest, GetMetadataRequest, JobList,
    Metadata as ProtoMetadata, SaveMetadataRequest,
};
use crate::registry::{JobRegistry, Metadata};

/// gRPC front for the registry and the execution coordinator.
///
/// Each request gets its own [`RequestContext`], cancelled on server
/// shutdown and bounded by the configured request timeout.
pub struct JobServiceImpl {
    registry: Arc<JobRegistry>,
    coordinator: Arc<ExecutionCoordinator>,
    shutdown: CancellationToken,
    request_timeout: Duration,
}

impl JobServiceImpl {
    pub fn new(
        registry: Arc<JobRegistry>,
        coordinator: Arc<ExecutionCoordinator>,
        shutdown: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            coordinator,
            shutdown,
            request_timeout,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_cancellation(self.shutdown.child_token())
            .with_timeout(self.request_timeout)
    }
}

#[tonic::async_trait]
impl JobService for JobServiceImpl {
    async fn save_metadata(
        &self,
        request: Request<SaveMetadataRequest>,
    ) -> Result<Response<ProtoMetadata>, Status> {
        let req = request.into_inner();
        let metadata: Metadata = req.metadata.map(Metadata::from).unwrap_or_default();

        let stored = self
            .registry
            .register(&self.context(), &req.name, metadata)
            .await?;

        Ok(Response::new(stored.into()))
    }

    async fn get_metadata(
        &self,
        request: Request<GetMetadataRequest>,
    ) -> Result<Response<ProtoMetadata>, Status> {
        let req = request.into_inner();

        let metadata = self.registry.fetch(&self.context(), &req.job_name).await?;

        Ok(Response::new(metadata.into()))
    }

    async fn get_available_jobs(
        &self,
        _request: Request<GetAvailableJobsRequest>,
    ) -> Result<Response<JobList>, Status> {
        let jobs = self.registry.list(&self.context()).await?;

        Ok(Response::new(JobList { jobs }))
    }

    async fn execute_job(
        &self,
        request: Request<ExecuteJobRequest>,
    ) -> Result<Response<ExecuteJobResponse>, Status> {
        let req = request.into_inner();

        let response = self
            .coordinator
            .execute(&self.context(), &req.job_name, req.arguments)
            .await?;

        Ok(Response::new(ExecuteJobResponse {
            status: response.status,
        }))
    }
}
