//! Handler error types

use crate::protocol::CloseCode;
use kizuna_service::ServiceError;
use thiserror::Error;

/// Faults that end a connection. Rejections a client can recover from are
/// reported in-band and never surface here.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload did not match the op's schema
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Op code the client is not allowed to send
    #[error("Unexpected op code: {0}")]
    UnexpectedOp(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Authentication or another service call failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Close code sent to the client for this fault.
    ///
    /// Credential problems get their own non-retryable codes. A store
    /// failure while resolving the user during `Identify` surfaces as
    /// `ServiceError::Internal` and closes with `UnknownError` (4000), which
    /// clients treat as retryable with the same credential.
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::UnexpectedOp(_) => CloseCode::UnknownOpcode,
            Self::NotAuthenticated | Self::Service(ServiceError::Unauthenticated) => {
                CloseCode::NotAuthenticated
            }
            Self::AlreadyAuthenticated => CloseCode::AlreadyAuthenticated,
            Self::Service(ServiceError::InvalidCredential) => CloseCode::AuthenticationFailed,
            Self::Service(ServiceError::UnknownUser) => CloseCode::UnknownUser,
            Self::Service(_) | Self::Internal(_) => CloseCode::UnknownError,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
