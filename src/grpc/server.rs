use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::grpc::service::JobServiceImpl;
use crate::proto::job_service_server::JobServiceServer;
use crate::tls::TlsIdentity;

pub struct GrpcServer {
    service: JobServiceImpl,
    tls_identity: Option<TlsIdentity>,
    shutdown: CancellationToken,
}

impl GrpcServer {
    pub fn new(
        service: JobServiceImpl,
        tls_identity: Option<TlsIdentity>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            tls_identity,
            shutdown,
        }
    }

    fn builder(&self) -> Result<Server, tonic::transport::Error> {
        let builder = Server::builder();
        match self.tls_identity {
            Some(ref identity) => builder.tls_config(identity.server_tls_config()),
            None => Ok(builder),
        }
    }

    /// Bind `addr` and serve until the shutdown token fires.
    pub async fn run(self, addr: SocketAddr) -> Result<(), tonic::transport::Error> {
        let mut builder = self.builder()?;
        let shutdown = self.shutdown.clone();

        tracing::info!(addr = %addr, tls = self.tls_identity.is_some(), "Starting gRPC server");

        builder
            .add_service(JobServiceServer::new(self.service))
            .serve_with_shutdown(addr, shutdown.cancelled_owned())
            .await
    }

    /// Serve on an already bound listener until the shutdown token fires.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
    ) -> Result<(), tonic::transport::Error> {
        let mut builder = self.builder()?;
        let shutdown = self.shutdown.clone();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, tls = self.tls_identity.is_some(), "Starting gRPC server");
        }

        builder
            .add_service(JobServiceServer::new(self.service))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                shutdown.cancelled_owned(),
            )
            .await
    }
}
