use std::path::PathBuf;
use thiserror::Error;

/// MongoDB server error code for unique index violations.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error("invalid '{key}' setting: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("a record with the same '{field}' already exists")]
    Conflict { field: &'static str },

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

impl StoreError {
    pub fn required(field: &str) -> StoreError {
        StoreError::Validation(format!("path `{}` is required", field))
    }

    /// Maps a write failure to [`StoreError::Conflict`] when it was caused by the
    /// unique index on `field`.
    pub fn from_write(e: mongodb::error::Error, field: &'static str) -> StoreError {
        use mongodb::error::{ErrorKind, WriteFailure};

        let duplicate = match e.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY,
            ErrorKind::Command(c) => c.code == DUPLICATE_KEY,
            _ => false,
        };

        if duplicate {
            StoreError::Conflict { field }
        } else {
            StoreError::Database(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token in the Authorization header")]
    MissingToken,
    #[error("token subject is not a valid id")]
    MalformedSubject,
    #[error("no teacher with id {0}")]
    UnknownPrincipal(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("authentication state isn't managed by the server")]
    Unavailable,
    #[error("password hashing task failed: {0}")]
    Hashing(#[from] tokio::task::JoinError),

    // External errors
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}
