//! File-backed ledger persistence.
//!
//! Only completed sessions are written; open timers never reach the file.
//!
//! # File Format
//!
//! ```json
//! {
//!   "123456789": {
//!     "sessions": [
//!       {
//!         "game_name": "Chess",
//!         "start_time": "2026-03-01T12:00:00Z",
//!         "end_time": "2026-03-01T12:01:30Z",
//!         "duration_seconds": 90.0
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Unknown fields are ignored on load. A missing file is an empty ledger, and
//! so is an empty (whitespace-only) file. Anything else that does not decode
//! is a [`StorageError::Format`].
//!
//! # Atomic Writes
//!
//! Uses temp file + rename in the target directory, so readers see either the
//! previous file or the new one.

use fs_err as fs;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Result, StorageError};
use crate::ledger::{Ledger, SessionHistory};

#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LedgerStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Ledger> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Ledger file does not exist yet");
                return Ok(Ledger::new());
            }
            Err(err) => return Err(StorageError::io("Failed to read ledger file", err)),
        };

        if content.trim().is_empty() {
            tracing::warn!(path = %self.path.display(), "Ledger file is empty");
            return Ok(Ledger::new());
        }

        let histories: HashMap<String, SessionHistory> =
            serde_json::from_str(&content).map_err(|source| StorageError::Format {
                path: self.path.clone(),
                source,
            })?;

        let ledger = Ledger::from_histories(histories);
        tracing::info!(
            path = %self.path.display(),
            users = ledger.len(),
            sessions = ledger.session_count(),
            "Ledger loaded"
        );
        Ok(ledger)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        let content =
            serde_json::to_string_pretty(&ledger.histories()).map_err(encode_error)?;

        let parent_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent_dir)
            .map_err(|err| StorageError::io("Failed to create ledger directory", err))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|err| StorageError::io("Failed to create temp ledger file", err))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|err| StorageError::io("Failed to write temp ledger file", err))?;
        temp_file
            .flush()
            .map_err(|err| StorageError::io("Failed to flush temp ledger file", err))?;
        temp_file.persist(&self.path).map_err(|err| {
            StorageError::io(
                format!("Failed to replace {}", self.path.display()),
                err.error,
            )
        })?;

        tracing::debug!(path = %self.path.display(), users = ledger.len(), "Ledger saved");
        Ok(())
    }
}

/// Encoding happens before anything touches the file, so a failure here is
/// a write-side I/O problem, never a malformed file.
fn encode_error(source: serde_json::Error) -> StorageError {
    StorageError::io("Failed to serialize ledger", std::io::Error::other(source))
}
