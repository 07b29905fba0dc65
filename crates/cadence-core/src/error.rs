//! Error types for cadence.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{EntityKind, Ref};

/// Result type alias using cadence's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cadence clone operations.
///
/// Every variant aborts the enclosing clone transaction. Use
/// [`Error::is_client_error`] to tell bad input apart from a server or
/// storage failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage failure (connectivity, driver, unclassified constraint)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Source entity is absent, soft-deleted, or not readable by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Root attributes fail domain rules after inheritance
    #[error("Validation error: {0}")]
    Validation(String),

    /// An ancestor reference was read before its entity type was cloned
    #[error("Clone ordering violation: {kind}.{field} references {id} which has no clone yet")]
    OrderingViolation {
        kind: EntityKind,
        field: Ref,
        id: Uuid,
    },

    /// A cloned row breaks a uniqueness or placement rule
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller may read the source but not write the destination
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the caller can fix the failure by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Validation(_) | Error::Conflict(_) | Error::Forbidden(_)
        )
    }

    /// Short machine-readable classification, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "persistence",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::OrderingViolation { .. } => "ordering_violation",
            Error::Conflict(_) => "conflict",
            Error::Forbidden(_) => "forbidden",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation()
            {
                return Error::Conflict(db.message().to_string());
            }
        }
        Error::Database(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
