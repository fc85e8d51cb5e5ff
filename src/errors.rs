use thiserror::Error;

/// Error type for catalog, dump and render operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Error that occurs while querying the catalog (e.g., SQL query failure).
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    /// Connection error (e.g., unreachable server or bad credentials).
    #[error("Connection error: {0}")]
    Connection(String),
    /// Configuration error (e.g., invalid database URL or missing parameters).
    #[error("Configuration error: {0}")]
    Config(String),
    /// The output sink could not be opened or written.
    #[error("Render error: {0}")]
    Render(#[from] std::io::Error),
    /// A schema dump could not be serialized or loaded.
    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}
