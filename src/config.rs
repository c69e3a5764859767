use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::RegisterStrategy;

/// Configuration for Docker-based job execution.
///
/// All jobs run in sandboxed Docker containers for security.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Docker CLI to invoke
    pub docker_binary: PathBuf,
    /// Disable network access in container
    pub network_disabled: bool,
    /// Memory limit (e.g., "256m")
    pub memory_limit: Option<String>,
    /// CPU limit (e.g., "0.5" for half a CPU)
    pub cpu_limit: Option<String>,
    /// Upper bound on a single run; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            docker_binary: PathBuf::from("docker"),
            network_disabled: true,
            memory_limit: Some("256m".to_string()),
            cpu_limit: Some("0.5".to_string()),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// TLS configuration for the gRPC endpoint.
///
/// When enabled, communication uses mutual TLS (mTLS):
/// - The server presents its certificate and verifies client certificates
/// - Clients present their certificate and verify the server certificate
/// - Both sides must have certificates signed by the same CA
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Enable TLS. If false, all other TLS settings are ignored.
    pub enabled: bool,

    /// Path to the CA certificate (PEM format).
    pub ca_cert_path: Option<PathBuf>,

    /// Path to this node's certificate (PEM format).
    pub cert_path: Option<PathBuf>,

    /// Path to this node's private key (PEM format).
    pub key_path: Option<PathBuf>,

    /// When true and TLS files are missing, run in plaintext with a warning.
    /// When false and TLS files are missing, fail to start.
    pub allow_insecure: bool,
}

impl TlsConfig {
    /// Check if TLS is properly configured with all required files.
    pub fn is_complete(&self) -> bool {
        self.enabled
            && self.ca_cert_path.is_some()
            && self.cert_path.is_some()
            && self.key_path.is_some()
    }
}

/// Where registry records live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreConfig {
    /// Process-local map; contents are lost on restart
    #[default]
    Memory,
    /// Shared Redis server, e.g. `redis://127.0.0.1:6379/0`
    Redis { url: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Deadline applied to every incoming request
    pub request_timeout: Duration,
    pub register_strategy: RegisterStrategy,
    pub store: StoreConfig,
    pub sandbox: SandboxConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 50051)),
            request_timeout: Duration::from_secs(900),
            register_strategy: RegisterStrategy::default(),
            store: StoreConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_config_default() {
        let cfg = SandboxConfig::default();
        assert_eq!(cfg.docker_binary, PathBuf::from("docker"));
        assert!(cfg.network_disabled);
        assert_eq!(cfg.memory_limit.as_deref(), Some("256m"));
        assert_eq!(cfg.cpu_limit.as_deref(), Some("0.5"));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn tls_config_default_is_disabled() {
        let cfg = TlsConfig::default();
        assert!(!cfg.enabled);
        assert!(!cfg.is_complete());
    }

    #[test]
    fn tls_config_is_not_complete_when_path_missing() {
        let base = TlsConfig {
            enabled: true,
            ca_cert_path: Some(PathBuf::from("/ca.pem")),
            cert_path: Some(PathBuf::from("/cert.pem")),
            key_path: Some(PathBuf::from("/key.pem")),
            allow_insecure: false,
        };
        assert!(base.is_complete());

        let mut cfg = base.clone();
        cfg.ca_cert_path = None;
        assert!(!cfg.is_complete());

        let mut cfg = base.clone();
        cfg.cert_path = None;
        assert!(!cfg.is_complete());

        let mut cfg = base;
        cfg.key_path = None;
        assert!(!cfg.is_complete());
    }

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:50051");
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.register_strategy, RegisterStrategy::ConditionalWrite);
    }

    #[test]
    fn server_config_builders() {
        let addr: SocketAddr = "10.0.0.1:9000".parse().unwrap();
        let cfg = ServerConfig::new(addr)
            .with_store(StoreConfig::Redis {
                url: "redis://localhost:6379/0".to_string(),
            })
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
        assert!(matches!(cfg.store, StoreConfig::Redis { .. }));
    }
}
