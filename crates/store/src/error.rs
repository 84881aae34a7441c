use thiserror::Error;

/// Errors that can occur when interacting with the commerce store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to a domain type.
    #[error("Invalid stored value in column '{column}': {value}")]
    Decode { column: &'static str, value: String },

    /// The store refused the write.
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
