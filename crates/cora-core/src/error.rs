use thiserror::Error;

/// Top-level error type for Cora.
///
/// Covers the failures that can happen outside a request cycle: loading the
/// configuration, reading and writing files, and (de)serializing JSON.
/// Backend and chat errors live in their own crates and are converted into a
/// transcript turn rather than propagated.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: [{section}] {key}")]
    MissingKey { section: String, key: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CoraError {
    fn from(err: toml::de::Error) -> Self {
        CoraError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CoraError {
    fn from(err: serde_json::Error) -> Self {
        CoraError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Cora operations.
pub type Result<T> = std::result::Result<T, CoraError>;
