//! Unified application error model, mirroring the tagged-enum-plus-mapping shape used
//! throughout the storage and RPC boundaries of this codebase.

use thiserror::Error;

/// Error kinds surfaced at the RPC boundary (spec §7).
#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("invalid_argument: {0}")]
    InvalidArgument(String),

    #[error("already_exists: {0}")]
    AlreadyExists(String),

    #[error("not_found: {0}")]
    NotFound(String),

    #[error("reference_missing: {0}")]
    ReferenceMissing(String),

    #[error("storage_unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type GateResult<T> = Result<T, GateError>;

impl GateError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        GateError::InvalidArgument(msg.into())
    }
    pub fn exists<S: Into<String>>(msg: S) -> Self {
        GateError::AlreadyExists(msg.into())
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        GateError::NotFound(msg.into())
    }
    pub fn reference_missing<S: Into<String>>(msg: S) -> Self {
        GateError::ReferenceMissing(msg.into())
    }
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        GateError::StorageUnavailable(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GateError::Internal(msg.into())
    }

    /// Map to a gRPC status code, the way the teacher maps `AppError` to an HTTP status
    /// and a pgwire (sqlstate, severity) pair for its other two frontends.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            GateError::InvalidArgument(_) => tonic::Code::InvalidArgument,
            GateError::AlreadyExists(_) => tonic::Code::AlreadyExists,
            GateError::NotFound(_) => tonic::Code::NotFound,
            GateError::ReferenceMissing(_) => tonic::Code::FailedPrecondition,
            GateError::StorageUnavailable(_) => tonic::Code::Unavailable,
            GateError::Internal(_) => tonic::Code::Internal,
        }
    }
}

impl From<GateError> for tonic::Status {
    fn from(err: GateError) -> Self {
        tonic::Status::new(err.grpc_code(), err.to_string())
    }
}

impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        GateError::Internal(err.to_string())
    }
}
