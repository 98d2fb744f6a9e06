//! Error taxonomy for the gallery core.
//!
//! `NotFound` and `AccessDenied` propagate to the request edge.
//! `Corrupt` and `Transient` are absorbed at the boundary of the
//! component that owns them (see each module for where).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("corrupt: {0}")]
    Corrupt(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<sqlx::Error> for GalleryError {
    fn from(error: sqlx::Error) -> Self {
        GalleryError::Database(error.to_string())
    }
}

impl From<std::io::Error> for GalleryError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => GalleryError::NotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => GalleryError::AccessDenied(error.to_string()),
            _ => GalleryError::Io(error.to_string()),
        }
    }
}

pub type GalleryResult<T> = Result<T, GalleryError>;
