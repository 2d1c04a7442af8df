use sqlx::error::ErrorKind;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure at the persistence seam.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] BoxError),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store misconfigured: {0}")]
    Misconfigured(String),
}

/// Outcome of a failed core operation.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("{0}")]
    Validation(String),

    #[error("Poll not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] BoxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PollError {
    pub fn validation(message: impl Into<String>) -> Self {
        PollError::Validation(message.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if is_constraint_violation(db_err.kind()) => {
                StoreError::Constraint(db_err.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Database(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(Box::new(err)),
            other => StoreError::Corrupt(other.to_string()),
        }
    }
}

// Busy, locked and similar engine errors stay transient
fn is_constraint_violation(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation
    )
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(format!("invalid options column: {err}"))
    }
}

impl From<StoreError> for PollError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(source) => PollError::StoreUnavailable(source),
            StoreError::Corrupt(message)
            | StoreError::Constraint(message)
            | StoreError::Misconfigured(message) => PollError::Internal(message),
        }
    }
}
