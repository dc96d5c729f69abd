//! Derived, read-only projections of the canonical table.
//!
//! A [`View`] is rebuilt, never mutated, every time the pipeline runs. Each
//! row remembers the canonical [`RowId`] it came from so an edit made on a
//! sorted or filtered view lands on the right canonical row. Rows produced by
//! the group stage are synthetic and carry no origin, which makes grouped
//! views read-only.

use crate::error::{EngineError, Result};
use crate::table::{Column, ColumnId, RowId, Table, Tabular, Value};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewRow {
    /// Canonical row this one was derived from; `None` for aggregates.
    pub origin: Option<RowId>,
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct View {
    columns: Vec<Column>,
    rows: Vec<ViewRow>,
    grouped: bool,
    source_revision: u64,
}

/// One window of a paginated view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<'a> {
    pub index: usize,
    pub size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
    /// Position in the view of the first row on this page
    pub first_row: usize,
    pub rows: &'a [ViewRow],
}

impl View {
    pub(crate) fn new(columns: Vec<Column>, rows: Vec<ViewRow>, grouped: bool) -> Self {
        Self {
            columns,
            rows,
            grouped,
            source_revision: 0,
        }
    }

    /// Identity projection of the whole table.
    pub fn of_table(table: &Table) -> Self {
        let rows = table
            .rows_slice()
            .iter()
            .enumerate()
            .map(|(idx, values)| ViewRow {
                origin: Some(idx),
                values: values.clone(),
            })
            .collect();
        Self::new(table.columns().to_vec(), rows, false)
    }

    pub(crate) fn with_revision(mut self, revision: u64) -> Self {
        self.source_revision = revision;
        self
    }

    /// Revision of the canonical table this view was built from.
    pub fn source_revision(&self) -> u64 {
        self.source_revision
    }

    pub fn view_rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// Whether cells of this view map back to canonical cells.
    pub fn is_editable(&self) -> bool {
        !self.grouped
    }

    /// Canonical row behind `view_row`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Index`] if `view_row` is out of range,
    /// [`EngineError::ReadOnlyView`] if the row is an aggregate.
    pub fn origin(&self, view_row: usize) -> Result<RowId> {
        let row = self.rows.get(view_row).ok_or(EngineError::Index {
            index: view_row,
            len: self.rows.len(),
        })?;
        row.origin
            .ok_or(EngineError::ReadOnlyView { row: view_row })
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> &[ViewRow] {
        self.rows.get(..n.min(self.rows.len())).unwrap_or_default()
    }

    /// Number of pages of `size` rows; an empty view has one empty page.
    pub fn page_count(&self, size: usize) -> usize {
        if size == 0 {
            return 1;
        }
        self.rows.len().div_ceil(size).max(1)
    }

    /// Rows `index * size .. (index + 1) * size`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Index`] if `index` is past the last page.
    pub fn page(&self, index: usize, size: usize) -> Result<Page<'_>> {
        let size = size.max(1);
        let total_pages = self.page_count(size);
        if index >= total_pages {
            return Err(EngineError::Index {
                index,
                len: total_pages,
            });
        }
        let first_row = index * size;
        let end = (first_row + size).min(self.rows.len());
        let rows = self.rows.get(first_row..end).unwrap_or_default();
        Ok(Page {
            index,
            size,
            total_rows: self.rows.len(),
            total_pages,
            first_row,
            rows,
        })
    }

    /// All values of one column, in view order.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownColumn`] if the column is not in this view.
    pub fn column_values(&self, column: &ColumnId) -> Result<Vec<&Value>> {
        let col = column.resolve(&self.columns)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row.values.get(col))
            .collect())
    }

    pub fn column(&self, column: &ColumnId) -> Result<&Column> {
        let idx = column.resolve(&self.columns)?;
        self.columns
            .get(idx)
            .ok_or_else(|| EngineError::unknown_column(column.to_string()))
    }
}

impl Tabular for View {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(|r| r.values.as_slice())
    }
}
