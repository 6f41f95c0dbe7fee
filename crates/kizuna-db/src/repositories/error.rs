//! Error handling utilities for repositories

use kizuna_core::{DomainError, Snowflake};
use sqlx::Error as SqlxError;

pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

pub fn message_not_found(id: Snowflake) -> DomainError {
    DomainError::MessageNotFound(id)
}
