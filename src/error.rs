//! Centralized error handling for the gridwork engine.
//!
//! Every engine operation returns [`Result<T>`], whose error side is
//! [`EngineError`]. Each variant carries the context a UI layer needs to
//! render a message without re-querying the engine: the column name, the row
//! index, and the raw text the user typed.
//!
//! ```
//! use gridwork::error::EngineError;
//!
//! fn message(err: &EngineError) -> String {
//!     match err {
//!         EngineError::InvalidEdit { column, raw, .. } => {
//!             format!("'{raw}' is not valid for column '{column}'")
//!         }
//!         EngineError::NoNumericColumns => "Nothing to describe".to_owned(),
//!         other => other.to_string(),
//!     }
//! }
//! ```
//!
//! Loader and exporter failures (`csv`, `calamine`, `rust_xlsxwriter`, file
//! system) convert through `From`, so `?` works across the I/O boundary.

use crate::table::ColumnKind;
use thiserror::Error;

/// Main error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input handed to `TableStore::load` is malformed.
    #[error("Load error: {0}")]
    Load(String),

    /// A column identifier does not resolve against the schema.
    #[error("Unknown column: '{column}'")]
    UnknownColumn { column: String },

    /// Group stage asked for an aggregation the engine does not implement.
    #[error("Unknown aggregation function: '{name}'")]
    UnknownAggregation { name: String },

    /// Raw text cannot be converted to the column's declared kind.
    #[error("Cannot convert '{raw}' to {kind} for column '{column}'")]
    TypeCoercion {
        column: String,
        kind: ColumnKind,
        raw: String,
    },

    /// A user edit was rejected; the canonical table is unchanged.
    #[error("Invalid edit at row {row}, column '{column}': '{raw}' is not a valid {kind}")]
    InvalidEdit {
        row: usize,
        column: String,
        kind: ColumnKind,
        raw: String,
    },

    /// Row (or page) index outside the addressable range.
    #[error("Index {index} out of range (len {len})")]
    Index { index: usize, len: usize },

    /// `describe` was asked to summarise a table without numeric columns.
    #[error("No numeric columns to describe")]
    NoNumericColumns,

    /// Edit targeted a view whose rows have no canonical origin (grouped).
    #[error("View row {row} is an aggregate and cannot be edited")]
    ReadOnlyView { row: usize },

    /// Loader/exporter does not know the file extension.
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }

    /// True for errors caused by user input rather than by the environment.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::Csv(_) | Self::XlsxRead(_) | Self::XlsxWrite(_) | Self::Json(_)
        )
    }
}

// UI layers that marshal errors as plain strings
impl From<EngineError> for String {
    fn from(err: EngineError) -> Self {
        err.to_string()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
