//! Column definitions and column lookup.

use super::value::ColumnKind;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Ordinal position within its table or view.
    pub position: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, position: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            position,
        }
    }
}

/// How a caller refers to a column: by name, or by ordinal position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnId {
    Name(String),
    Index(usize),
}

impl ColumnId {
    /// Position of this column in `columns`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownColumn`] if no column matches.
    pub fn resolve(&self, columns: &[Column]) -> Result<usize> {
        match self {
            Self::Name(name) => columns
                .iter()
                .position(|c| c.name == *name)
                .ok_or_else(|| EngineError::unknown_column(name.clone())),
            Self::Index(idx) if *idx < columns.len() => Ok(*idx),
            Self::Index(_) => Err(EngineError::unknown_column(self.to_string())),
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

impl From<&str> for ColumnId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ColumnId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for ColumnId {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<usize> for ColumnId {
    fn from(idx: usize) -> Self {
        Self::Index(idx)
    }
}

/// Position of the column called `name`.
pub(crate) fn position_of(columns: &[Column], name: &str) -> Result<usize> {
    ColumnId::from(name).resolve(columns)
}

/// Renumber `position` after the column set has been rebuilt.
pub(crate) fn renumber(columns: &mut [Column]) {
    for (idx, column) in columns.iter_mut().enumerate() {
        column.position = idx;
    }
}
