use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{ServerConfig, StoreConfig};
use crate::coordinator::ExecutionCoordinator;
use crate::error::{JobDockError, Result};
use crate::executor::{DockerExecutor, Executor};
use crate::grpc::{GrpcServer, JobServiceImpl};
use crate::registry::JobRegistry;
use crate::store::{KeyValueStore, MemoryStore, RedisStore};
use crate::tls::TlsIdentity;

/// A server process: one shared store, the registry and coordinator on top
/// of it, and the gRPC endpoint in front.
pub struct Node {
    pub config: ServerConfig,
    pub registry: Arc<JobRegistry>,
    pub coordinator: Arc<ExecutionCoordinator>,
    tls_identity: Option<TlsIdentity>,
}

impl Node {
    /// Wire a node from its configuration, connecting to the configured
    /// store and using the Docker executor.
    pub async fn new(config: ServerConfig, tls_identity: Option<TlsIdentity>) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store {
            StoreConfig::Memory => {
                tracing::warn!("Using in-memory store, registrations are lost on restart");
                Arc::new(MemoryStore::new())
            }
            StoreConfig::Redis { ref url } => {
                let store = RedisStore::connect(url).await.map_err(|source| {
                    JobDockError::Store {
                        op: "connect",
                        key: url.clone(),
                        source,
                    }
                })?;
                Arc::new(store)
            }
        };
        let executor = Arc::new(DockerExecutor::new(config.sandbox.clone()));

        Ok(Self::with_components(config, store, executor, tls_identity))
    }

    /// Wire a node around caller-supplied store and executor.
    pub fn with_components(
        config: ServerConfig,
        store: Arc<dyn KeyValueStore>,
        executor: Arc<dyn Executor>,
        tls_identity: Option<TlsIdentity>,
    ) -> Self {
        let registry = Arc::new(JobRegistry::with_strategy(store, config.register_strategy));
        let coordinator = Arc::new(ExecutionCoordinator::new(registry.clone(), executor));

        Self {
            config,
            registry,
            coordinator,
            tls_identity,
        }
    }

    fn server(&self, shutdown: CancellationToken) -> GrpcServer {
        let service = JobServiceImpl::new(
            self.registry.clone(),
            self.coordinator.clone(),
            shutdown.clone(),
            self.config.request_timeout,
        );
        GrpcServer::new(service, self.tls_identity.clone(), shutdown)
    }

    /// Serve on the configured address until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!(
            listen_addr = %self.config.listen_addr,
            store = ?self.config.store,
            register_strategy = ?self.config.register_strategy,
            "Starting jobdock node"
        );

        let addr = self.config.listen_addr;
        self.server(shutdown).run(addr).await?;
        tracing::info!("jobdock node stopped");
        Ok(())
    }

    /// Serve on `listener` until `shutdown` is cancelled.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.server(shutdown).run_with_listener(listener).await?;
        Ok(())
    }
}
