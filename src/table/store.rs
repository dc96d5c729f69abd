//! Owner of the canonical table.
//!
//! `TableStore` is the single mutation point for the dataset: [`load`]
//! replaces it wholesale and [`set_cell`] changes one cell. Every successful
//! mutation bumps a revision counter, which is how pipelines find out that
//! the view they hold is stale.
//!
//! [`load`]: TableStore::load
//! [`set_cell`]: TableStore::set_cell

use super::schema::ColumnId;
use super::value::{NaValues, Value};
use super::{Column, RawTable, Table, Tabular as _};
use crate::error::{EngineError, Result};

#[derive(Debug, Default)]
pub struct TableStore {
    table: Table,
    na: NaValues,
    revision: u64,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that treats `na` tokens as missing when loading and editing.
    pub fn with_na_values(na: NaValues) -> Self {
        Self {
            na,
            ..Self::default()
        }
    }

    /// Replace the canonical dataset.
    ///
    /// On failure the previously loaded table stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] for ragged rows or duplicate column names.
    pub fn load(&mut self, raw: RawTable) -> Result<&Table> {
        let table = Table::from_raw(raw, &self.na)?;
        tracing::info!(
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded table"
        );
        self.replace(table);
        Ok(&self.table)
    }

    /// Replace the canonical dataset with an already typed table.
    pub fn replace(&mut self, table: Table) {
        self.table = table;
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.replace(Table::default());
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        self.table.columns()
    }

    pub fn na_values(&self) -> &NaValues {
        &self.na
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// # Errors
    ///
    /// [`EngineError::Index`] for an out-of-range row,
    /// [`EngineError::UnknownColumn`] for an absent column.
    pub fn get_cell(&self, row: usize, column: &ColumnId) -> Result<&Value> {
        let col = column.resolve(self.table.columns())?;
        self.check_row(row)?;
        self.table
            .row(row)
            .and_then(|r| r.get(col))
            .ok_or(EngineError::Index {
                index: row,
                len: self.table.row_count(),
            })
    }

    /// Convert `raw` into the declared kind of `column` without writing it.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownColumn`] or [`EngineError::TypeCoercion`].
    pub fn coerce(&self, column: &ColumnId, raw: &str) -> Result<Value> {
        let col = self.table.column(column)?;
        col.kind
            .coerce(raw, &self.na)
            .ok_or_else(|| EngineError::TypeCoercion {
                column: col.name.clone(),
                kind: col.kind,
                raw: raw.to_owned(),
            })
    }

    /// Coerce `raw` and write it to one cell, returning the previous value.
    ///
    /// Nothing is written unless coercion succeeds.
    ///
    /// # Errors
    ///
    /// [`EngineError::Index`], [`EngineError::UnknownColumn`] or
    /// [`EngineError::TypeCoercion`].
    pub fn set_cell(&mut self, row: usize, column: &ColumnId, raw: &str) -> Result<Value> {
        let col = column.resolve(self.table.columns())?;
        self.check_row(row)?;
        let value = self.coerce(column, raw)?;

        let len = self.table.row_count();
        let cell = self
            .table
            .cell_mut(row, col)
            .ok_or(EngineError::Index { index: row, len })?;
        let previous = std::mem::replace(cell, value);
        self.revision += 1;

        tracing::debug!(row, column = %column, revision = self.revision, "Cell updated");
        Ok(previous)
    }

    /// Put back a value replaced by [`set_cell`](Self::set_cell) and rewind
    /// the revision to `revision`.
    pub(crate) fn restore_cell(
        &mut self,
        row: usize,
        column: &ColumnId,
        value: Value,
        revision: u64,
    ) -> Result<()> {
        let col = column.resolve(self.table.columns())?;
        let len = self.table.row_count();
        let cell = self
            .table
            .cell_mut(row, col)
            .ok_or(EngineError::Index { index: row, len })?;
        *cell = value;
        self.revision = revision;
        tracing::debug!(row, column = %column, revision, "Cell restored");
        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        let len = self.table.row_count();
        if row < len {
            Ok(())
        } else {
            Err(EngineError::Index { index: row, len })
        }
    }
}
