use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Alert capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Alert delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
