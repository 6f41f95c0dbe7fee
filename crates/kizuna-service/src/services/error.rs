//! Service layer error types
//!
//! One taxonomy for every realtime operation. The gateway maps these onto
//! close codes (authentication) or `MESSAGE_ERROR` events (commands).

use kizuna_common::AppError;
use kizuna_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No credential, or one that is not even shaped like a token
    #[error("Authentication required")]
    Unauthenticated,

    /// Credential failed verification (signature, expiry, token type)
    #[error("Invalid credential")]
    InvalidCredential,

    /// Credential is valid but its subject no longer exists
    #[error("Unknown user")]
    UnknownUser,

    /// Caller may not act on the room or message
    #[error("Forbidden")]
    Forbidden,

    /// Message failed validation before persistence
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The message store rejected a write
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Referenced resource does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::InvalidMessage(reason.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a store failure raised while writing
    pub fn persistence(err: &DomainError) -> Self {
        Self::PersistenceFailure(err.to_string())
    }

    /// Stable error code sent to clients as the `reason` of `MESSAGE_ERROR`
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::UnknownUser => "UNKNOWN_USER",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidMessage(_) => "INVALID_MESSAGE",
            Self::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error came out of connection authentication
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated | Self::InvalidCredential | Self::UnknownUser
        )
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        if err.is_validation() {
            Self::InvalidMessage(err.to_string())
        } else if err.is_authorization() {
            Self::Forbidden
        } else {
            match err {
                DomainError::UserNotFound(id) => Self::not_found("User", id.to_string()),
                DomainError::RoomNotFound(id) => Self::not_found("Room", id.to_string()),
                DomainError::MessageNotFound(id) => Self::not_found("Message", id.to_string()),
                other => Self::Internal(other.to_string()),
            }
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::MissingAuth => Self::Unauthenticated,
            AppError::InvalidToken | AppError::TokenExpired => Self::InvalidCredential,
            AppError::Domain(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
