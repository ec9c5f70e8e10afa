use thiserror::Error;

/// Fatal errors for a whole compare / apply call
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("comparison task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for VerificationError {
    fn from(e: sqlx::Error) -> Self {
        VerificationError::RepositoryUnavailable(e.to_string())
    }
}

/// Outcome of a single write inside a store transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("association already exists: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}

impl From<StoreError> for VerificationError {
    fn from(e: StoreError) -> Self {
        VerificationError::RepositoryUnavailable(e.to_string())
    }
}
