/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .arff / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  schema, class index, Vec<Record>
///   └──────────┘
/// ```
pub mod loader;
pub mod model;

use std::path::PathBuf;

use thiserror::Error;

pub use model::{Attribute, AttributeKind, Dataset, Record, Value};

/// Why a data file could not be turned into a [`Dataset`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),
    #[error("line {line}: {message}")]
    Syntax { line: u64, message: String },
    #[error("invalid value '{value}' for attribute '{attribute}': {reason}")]
    InvalidValue {
        attribute: String,
        value: String,
        reason: String,
    },
    #[error("row {row}: expected {expected} values, found {found}")]
    Arity {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("no attributes declared")]
    NoAttributes,
    #[error("unknown class attribute '{0}'")]
    UnknownClass(String),
    #[error("column '{0}' is missing")]
    MissingColumn(String),
    #[error("column '{0}' is not in the header")]
    UnexpectedColumn(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
