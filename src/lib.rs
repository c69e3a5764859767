pub mod arguments;
pub mod client;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod grpc;
pub mod node;
pub mod registry;
pub mod shutdown;
pub mod store;
pub mod tls;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("jobdock");
}
