use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("Store error: {0}")]
    Other(String),
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Database(e.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
