use std::collections::HashMap;
use std::path::PathBuf;

use tonic::transport::Channel;

use crate::error::{JobDockError, Result};
use crate::proto::job_service_client::JobServiceClient;
use crate::proto::{
    ExecuteJobRequest, GetAvailableJobsRequest, GetMetadataRequest, SaveMetadataRequest,
};
use crate::registry::{JobList, Metadata};
use crate::tls::client_tls_config;

/// Connection settings for talking to a jobdock server.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Server address, `http://` or `https://`
    pub addr: String,
    pub ca_cert: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    fn uses_tls(&self) -> bool {
        self.ca_cert.is_some() || self.addr.starts_with("https://")
    }
}

/// Typed client for the job service.
///
/// Statuses received from the server are turned back into
/// [`JobDockError`] variants, so callers match on the same error kinds the
/// server produced.
#[derive(Debug, Clone)]
pub struct JobDockClient {
    inner: JobServiceClient<Channel>,
}

impl JobDockClient {
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = Channel::from_shared(config.addr.clone()).map_err(|e| {
            JobDockError::InvalidArgument(format!("invalid server address {:?}: {}", config.addr, e))
        })?;

        let channel = if config.uses_tls() {
            let tls = client_tls_config(
                config.ca_cert.as_deref(),
                config.cert.as_deref(),
                config.key.as_deref(),
            )
            .await
            .map_err(|e| JobDockError::Internal(format!("TLS config error: {}", e)))?;
            endpoint.tls_config(tls)?.connect().await?
        } else {
            endpoint.connect().await?
        };

        Ok(Self::from_channel(channel))
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self {
            inner: JobServiceClient::new(channel),
        }
    }

    pub async fn save_metadata(&mut self, name: &str, metadata: Metadata) -> Result<Metadata> {
        let response = self
            .inner
            .save_metadata(SaveMetadataRequest {
                name: name.to_string(),
                metadata: Some(metadata.into()),
            })
            .await
            .map_err(JobDockError::from_status)?;
        Ok(response.into_inner().into())
    }

    pub async fn get_metadata(&mut self, job_name: &str) -> Result<Metadata> {
        let response = self
            .inner
            .get_metadata(GetMetadataRequest {
                job_name: job_name.to_string(),
            })
            .await
            .map_err(JobDockError::from_status)?;
        Ok(response.into_inner().into())
    }

    pub async fn get_available_jobs(&mut self) -> Result<JobList> {
        let response = self
            .inner
            .get_available_jobs(GetAvailableJobsRequest {})
            .await
            .map_err(JobDockError::from_status)?;
        Ok(response.into_inner().jobs)
    }

    /// Execute `job_name` and return its terminal status.
    pub async fn execute_job(
        &mut self,
        job_name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<String> {
        let response = self
            .inner
            .execute_job(ExecuteJobRequest {
                job_name: job_name.to_string(),
                arguments,
            })
            .await
            .map_err(JobDockError::from_status)?;
        Ok(response.into_inner().status)
    }
}
