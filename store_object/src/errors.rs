//! Persistence error taxonomy
//!
//! Only [`PersistError::Unavailable`] describes a transient condition. Callers
//! decide whether to retry a registration based on [`PersistError::is_retryable`].

use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    /// Malformed input; nothing was written
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness constraint rejected the record; nothing was written
    #[error("Conflict on {kind}: {detail}")]
    Conflict { kind: String, detail: String },

    /// Transient connectivity failure or timeout
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal store error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Unavailable(_))
    }

    /// Classify a sqlx failure raised while operating on `kind`
    pub fn from_sqlx(kind: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                if db.is_unique_violation() {
                    return PersistError::Conflict {
                        kind: kind.to_string(),
                        detail: db.message().to_string(),
                    };
                }
                if db.is_check_violation() {
                    return PersistError::Validation(db.message().to_string());
                }
                match db.code().as_deref() {
                    // data exceptions and not-null violations
                    Some(code) if code.starts_with("22") || code == "23502" => {
                        PersistError::Validation(db.message().to_string())
                    }
                    // connection exceptions, admin shutdown, too many connections
                    Some(code)
                        if code.starts_with("08")
                            || code.starts_with("57P")
                            || code == "53300"
                            || code == "40001" =>
                    {
                        PersistError::Unavailable(db.message().to_string())
                    }
                    _ => PersistError::Internal(err.to_string()),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => PersistError::Unavailable(err.to_string()),
            _ => PersistError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationError> for PersistError {
    fn from(err: ValidationError) -> Self {
        PersistError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Internal(format!("Serialization error: {}", err))
    }
}
