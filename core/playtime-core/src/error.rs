//! Error types for ledger persistence.

use std::path::PathBuf;

/// Failures reading or writing the ledger file.
///
/// Neither variant is fatal to the tracker: a failed load starts from an
/// empty ledger, a failed save keeps the in-memory ledger authoritative.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger file malformed: {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, StorageError::Format { .. })
    }
}

/// Convenience type alias for Results using StorageError.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for String {
    fn from(err: StorageError) -> String {
        err.to_string()
    }
}
