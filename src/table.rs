//! The canonical dataset and the store that owns it.
//!
//! A [`Table`] is a rectangular grid of [`Value`]s with a fixed [`Column`]
//! schema. It is built once from a [`RawTable`] (the text grid handed over by
//! a loader), at which point every column's [`ColumnKind`] is inferred and
//! frozen. After that the only way to change a cell is
//! [`TableStore::set_cell`].
//!
//! Anything that looks like a table, whether the canonical one or a derived
//! view, implements [`Tabular`], which is what summaries and exporters read.

pub mod schema;
pub mod store;
pub mod value;

pub use schema::{Column, ColumnId};
pub use store::TableStore;
pub use value::{ColumnKind, DEFAULT_NA_VALUES, NaValues, Value};

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable identifier of a canonical row: its index in the canonical table.
pub type RowId = usize;

/// Untyped row/column text grid exchanged with loaders and exporters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }
}

/// Read access shared by the canonical table and derived views.
pub trait Tabular {
    fn columns(&self) -> &[Column];

    fn row_count(&self) -> usize;

    fn row(&self, index: usize) -> Option<&[Value]>;

    fn rows(&self) -> Box<dyn Iterator<Item = &[Value]> + '_> {
        Box::new((0..self.row_count()).filter_map(move |i| self.row(i)))
    }

    fn column_count(&self) -> usize {
        self.columns().len()
    }

    /// Column names and rows rendered as export text.
    fn to_rows(&self) -> RawTable {
        RawTable {
            columns: self.columns().iter().map(|c| c.name.clone()).collect(),
            rows: self
                .rows()
                .map(|row| row.iter().map(Value::to_raw).collect())
                .collect(),
        }
    }
}

/// The canonical dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a typed table from a raw text grid, inferring column kinds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] when a column name repeats or a row
    /// does not have exactly one cell per column.
    pub fn from_raw(raw: RawTable, na: &NaValues) -> Result<Self> {
        let RawTable { columns, rows } = raw;

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(EngineError::Load(format!("duplicate column name '{name}'")));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EngineError::Load(format!(
                    "row {idx} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }

        let kinds: Vec<ColumnKind> = (0..columns.len())
            .map(|c| infer_kind(rows.iter().filter_map(|r| r.get(c)), na))
            .collect();

        let typed_rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| load_cell(cell, *kind, na))
                    .collect()
            })
            .collect();

        let columns = columns
            .into_iter()
            .zip(kinds)
            .enumerate()
            .map(|(pos, (name, kind))| Column::new(name, kind, pos))
            .collect();

        Ok(Self {
            columns,
            rows: typed_rows,
        })
    }

    /// Build from already typed parts. Rows must match the column count.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] for duplicate names or ragged rows.
    pub fn from_parts(mut columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EngineError::Load(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(EngineError::Load(format!(
                "row {idx} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        schema::renumber(&mut columns);
        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, id: &ColumnId) -> Result<&Column> {
        let idx = id.resolve(&self.columns)?;
        self.columns
            .get(idx)
            .ok_or_else(|| EngineError::unknown_column(id.to_string()))
    }

    pub(crate) fn rows_slice(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Value> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }
}

impl Tabular for Table {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

/// Infer a column kind from its raw cells.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a String>, na: &NaValues) -> ColumnKind {
    let present: Vec<&str> = cells
        .map(|c| c.trim())
        .filter(|c| !na.is_missing(c))
        .collect();

    if present.is_empty() {
        ColumnKind::Null
    } else if present.iter().all(|c| value::parse_integer(c).is_some()) {
        ColumnKind::Integer
    } else if present.iter().all(|c| value::parse_float(c).is_some()) {
        ColumnKind::Float
    } else if present.iter().all(|c| value::parse_bool(c).is_some()) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

fn load_cell(raw: &str, kind: ColumnKind, na: &NaValues) -> Value {
    kind.coerce(raw, na).unwrap_or(Value::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            columns.iter().map(|s| (*s).to_owned()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| (*s).to_owned()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_kind_inference() -> anyhow::Result<()> {
        let t = Table::from_raw(
            raw(
                &["id", "name", "score", "flag", "empty"],
                &[&["1", "a", "3.5", "true", ""], &["2", "b", "", "no", "NA"]],
            ),
            &NaValues::default(),
        )?;
        let kinds: Vec<ColumnKind> = t.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                ColumnKind::Integer,
                ColumnKind::Text,
                ColumnKind::Float,
                ColumnKind::Boolean,
                ColumnKind::Null
            ]
        );
        assert_eq!(t.row(1).and_then(|r| r.get(2)), Some(&Value::Missing));
        Ok(())
    }

    #[test]
    fn test_ints_with_decimals_become_float() -> anyhow::Result<()> {
        let t = Table::from_raw(raw(&["x"], &[&["1"], &["2.5"]]), &NaValues::default())?;
        assert_eq!(t.columns().first().map(|c| c.kind), Some(ColumnKind::Float));
        assert_eq!(t.row(0).and_then(|r| r.first()), Some(&Value::Float(1.0)));
        Ok(())
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::from_raw(raw(&["a", "b"], &[&["1", "2"], &["3"]]), &NaValues::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Load(ref msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::from_raw(raw(&["a", "a"], &[]), &NaValues::default()).unwrap_err();
        assert!(matches!(err, EngineError::Load(ref msg) if msg.contains("'a'")));
    }

    #[test]
    fn test_to_rows_renders_missing_as_blank() -> anyhow::Result<()> {
        let t = Table::from_raw(raw(&["x"], &[&["1.5"], &["NA"]]), &NaValues::default())?;
        let out = t.to_rows();
        assert_eq!(out.rows, vec![vec!["1.5".to_owned()], vec![String::new()]]);
        Ok(())
    }
}
