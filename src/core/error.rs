use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt data in '{path}': {reason}")]
    CorruptData { path: String, reason: String },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(String),

    #[error("Enrichment failed: {0}")]
    PartialEnrichmentFailed(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn corrupt(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::CorruptData {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Loads treat a missing file as an empty result rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        Self::SerializationError(format!("csv: {err}"))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(err.to_string());
        }
        Self::IoError(err.to_string())
    }
}
