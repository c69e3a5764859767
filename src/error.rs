use thiserror::Error;
use tonic::{Code, Status};

use crate::executor::ExecutorError;
use crate::store::StoreError;

/// Message carried by every duplicate-registration failure.
pub const KEY_ALREADY_PRESENT: &str = "metadata: key already present";

/// Coarse classification shared by local errors and remote statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    InvalidArgument,
    Internal,
    Cancelled,
    DeadlineExceeded,
    Unavailable,
}

impl From<ErrorKind> for Code {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::AlreadyExists => Code::AlreadyExists,
            ErrorKind::NotFound => Code::NotFound,
            ErrorKind::InvalidArgument => Code::InvalidArgument,
            ErrorKind::Internal => Code::Internal,
            ErrorKind::Cancelled => Code::Cancelled,
            ErrorKind::DeadlineExceeded => Code::DeadlineExceeded,
            ErrorKind::Unavailable => Code::Unavailable,
        }
    }
}

#[derive(Error, Debug)]
pub enum JobDockError {
    #[error("{}", KEY_ALREADY_PRESENT)]
    AlreadyExists { key: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{op} {key}: {source}")]
    Store {
        op: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to decode metadata at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Corrupt record at {key}: stored name is {found:?}")]
    CorruptRecord { key: String, found: String },

    #[error("Execution of {job} failed: {source}")]
    Executor {
        job: String,
        #[source]
        source: ExecutorError,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("gRPC error: {0}")]
    GrpcError(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobDockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobDockError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            JobDockError::NotFound(_) => ErrorKind::NotFound,
            JobDockError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            JobDockError::Executor {
                source: ExecutorError::TimedOut(_),
                ..
            } => ErrorKind::DeadlineExceeded,
            JobDockError::Executor {
                source: ExecutorError::InvalidArgument(_),
                ..
            } => ErrorKind::InvalidArgument,
            JobDockError::Store { .. }
            | JobDockError::Decode { .. }
            | JobDockError::CorruptRecord { .. }
            | JobDockError::Executor { .. }
            | JobDockError::Internal(_) => ErrorKind::Internal,
            JobDockError::Cancelled => ErrorKind::Cancelled,
            JobDockError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            JobDockError::GrpcError(status) => kind_of_code(status.code()),
            JobDockError::TransportError(_) => ErrorKind::Unavailable,
        }
    }

    /// Rebuild a typed error from a status received over the wire.
    pub fn from_status(status: Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::AlreadyExists => JobDockError::AlreadyExists { key: message },
            Code::NotFound => JobDockError::NotFound(message),
            Code::InvalidArgument => JobDockError::InvalidArgument(message),
            Code::Cancelled => JobDockError::Cancelled,
            Code::DeadlineExceeded => JobDockError::DeadlineExceeded,
            Code::Internal => JobDockError::Internal(message),
            _ => JobDockError::GrpcError(status),
        }
    }
}

fn kind_of_code(code: Code) -> ErrorKind {
    match code {
        Code::AlreadyExists => ErrorKind::AlreadyExists,
        Code::NotFound => ErrorKind::NotFound,
        Code::InvalidArgument => ErrorKind::InvalidArgument,
        Code::Cancelled => ErrorKind::Cancelled,
        Code::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        Code::Unavailable => ErrorKind::Unavailable,
        _ => ErrorKind::Internal,
    }
}

impl From<JobDockError> for Status {
    fn from(err: JobDockError) -> Self {
        match err {
            JobDockError::GrpcError(status) => status,
            other => Status::new(other.kind().into(), other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobDockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_maps_to_grpc_code_with_fixed_message() {
        let status: Status = JobDockError::AlreadyExists {
            key: "metadata/a".to_string(),
        }
        .into();
        assert_eq!(status.code(), Code::AlreadyExists);
        assert_eq!(status.message(), KEY_ALREADY_PRESENT);
    }

    #[test]
    fn backend_failures_are_internal() {
        let err = JobDockError::Store {
            op: "get",
            key: "metadata/a".to_string(),
            source: StoreError::Backend("some error".to_string()),
        };
        assert_eq!(err.kind(), ErrorKind::Internal);

        let status: Status = err.into();
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("some error"));
        assert!(status.message().contains("metadata/a"));
    }

    #[test]
    fn executor_timeout_is_deadline_exceeded() {
        let err = JobDockError::Executor {
            job: "resize".to_string(),
            source: ExecutorError::TimedOut(std::time::Duration::from_secs(1)),
        };
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[test]
    fn executor_rejected_argument_is_invalid_argument() {
        let err = JobDockError::Executor {
            job: "resize".to_string(),
            source: ExecutorError::InvalidArgument("\"a=b\"".to_string()),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let status: Status = err.into();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[test]
    fn status_round_trips_to_same_kind() {
        for err in [
            JobDockError::AlreadyExists { key: "k".to_string() },
            JobDockError::NotFound("k".to_string()),
            JobDockError::InvalidArgument("bad".to_string()),
            JobDockError::Internal("boom".to_string()),
            JobDockError::Cancelled,
            JobDockError::DeadlineExceeded,
        ] {
            let kind = err.kind();
            let back = JobDockError::from_status(err.into());
            assert_eq!(back.kind(), kind);
        }
    }

    #[test]
    fn unmapped_status_keeps_original() {
        let back = JobDockError::from_status(Status::unavailable("down"));
        assert_eq!(back.kind(), ErrorKind::Unavailable);
        assert!(matches!(back, JobDockError::GrpcError(_)));
    }
}
