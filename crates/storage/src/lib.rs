//! Storage Layer
//!
//! Append-only CSV score log plus the debug image store.

mod debug_images;
mod record;
mod score_log;

pub use debug_images::{DebugImagePolicy, DebugImageStore};
pub use record::{DrowsinessRecord, TIMESTAMP_FORMAT};
pub use score_log::{read_records, ScoreLog};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        StorageError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}
