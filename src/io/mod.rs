//! File adapters.
//!
//! - [`table_csv`]: assignment tables as CSV (`Instance,<task ids>`)
//! - [`config_json`]: configuration bundles as JSON
//!
//! Readers and writers are generic over [`std::io::Read`] / [`std::io::Write`]
//! so they work on in-memory buffers as well as files.

pub mod config_json;
pub mod table_csv;

use std::path::PathBuf;

use thiserror::Error;

pub use config_json::{load_bundle, parse_bundle};
pub use table_csv::{load_table, read_table, save_table, write_table};

/// Failure reading or writing a file.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot access {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV header is empty")]
    MissingHeader,

    #[error("line {line}: invalid instance ordinal '{value}'")]
    Ordinal { line: u64, value: String },
}
