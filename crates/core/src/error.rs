//! Unified error types for pantry-offline.
//!
//! The prefixes in the display strings double as stable log tags.

use tokio_rusqlite::rusqlite;

/// Unified error types for the storage layer and lifecycle tasks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty partition name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored headers or catalog payload could not be (de)serialized.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),

    /// A startup population request came back with a non-ok status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A startup population request never produced a response.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Catalog import payload was unusable.
    #[error("CATALOG_IMPORT_FAILED: {0}")]
    CatalogImport(String),

    /// Install has not completed successfully.
    #[error("NOT_READY: {0}")]
    NotReady(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CatalogImport("missing data field".to_string());
        assert!(err.to_string().contains("CATALOG_IMPORT_FAILED"));
        assert!(err.to_string().contains("missing data field"));
    }

    #[test]
    fn test_rusqlite_error_converts_to_database() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("STORAGE_ERROR"));
    }

    #[test]
    fn test_nested_error_is_unwrapped() {
        let inner = Error::InvalidInput("empty partition name".to_string());
        let err: Error = tokio_rusqlite::Error::Error(inner).into();
        assert!(matches!(err, Error::InvalidInput(msg) if msg == "empty partition name"));
    }
}
