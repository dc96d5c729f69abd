//! Validated cell edits.
//!
//! [`EditController::apply`] is the only path from user-typed text to the
//! canonical table. It resolves the target, coerces the text into the
//! column's kind, writes the cell and refreshes the current view. A rejected
//! edit touches neither the table nor the view.
//!
//! Edits are addressed by canonical [`RowId`]. Use [`EditRequest::from_view`]
//! to translate a (view row, column) position taken from a sorted or filtered
//! view.

use crate::error::{EngineError, Result};
use crate::pipeline::{View, ViewPipeline};
use crate::table::{ColumnId, RowId, TableStore, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Entries kept in the edit journal.
pub const JOURNAL_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub row: RowId,
    pub column: ColumnId,
    pub raw_text: String,
}

impl EditRequest {
    pub fn new(row: RowId, column: impl Into<ColumnId>, raw_text: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Request for the cell shown at `view_row` of `view`.
    ///
    /// # Errors
    ///
    /// [`EngineError::ReadOnlyView`] for aggregate rows, [`EngineError::Index`]
    /// for a row outside the view.
    pub fn from_view(
        view: &View,
        view_row: usize,
        column: impl Into<ColumnId>,
        raw_text: impl Into<String>,
    ) -> Result<Self> {
        let row = view.origin(view_row)?;
        Ok(Self::new(row, column, raw_text))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EditPhase {
    #[default]
    Idle,
    Validating,
    Applied,
    Rejected,
}

/// Result of an applied edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub row: RowId,
    pub column: String,
    pub previous: Value,
    pub value: Value,
    /// View rebuilt with the last-used pipeline config.
    pub view: View,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub row: RowId,
    pub column: String,
    pub raw_text: String,
    pub accepted: bool,
    pub previous: Option<Value>,
}

#[derive(Debug, Default)]
pub struct EditController {
    phase: EditPhase,
    last_phase: EditPhase,
    journal: VecDeque<JournalEntry>,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase; always [`EditPhase::Idle`] between calls to [`apply`].
    ///
    /// [`apply`]: Self::apply
    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    /// Terminal phase of the most recent edit.
    pub fn last_phase(&self) -> EditPhase {
        self.last_phase
    }

    /// Most recent edits first.
    pub fn journal(&self) -> impl Iterator<Item = &JournalEntry> {
        self.journal.iter().rev()
    }

    /// Validate and apply one edit, then refresh the pipeline's view.
    ///
    /// When the refresh fails the cell and the store revision are put back,
    /// so an `Err` always means the table is unchanged.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidEdit`] when the text does not fit the column,
    /// [`EngineError::Index`] for a row outside the table,
    /// [`EngineError::UnknownColumn`] for an absent column, or whatever the
    /// refresh of the last pipeline config fails with.
    pub fn apply(
        &mut self,
        store: &mut TableStore,
        pipeline: &mut ViewPipeline,
        request: EditRequest,
    ) -> Result<EditOutcome> {
        self.phase = EditPhase::Validating;
        let revision = store.revision();
        let result = Self::validate_and_write(store, &request).and_then(
            |(column, previous, value)| match pipeline.refresh(store) {
                Ok(view) => Ok(EditOutcome {
                    row: request.row,
                    column,
                    previous,
                    value,
                    view: view.clone(),
                }),
                Err(err) => {
                    store.restore_cell(request.row, &request.column, previous, revision)?;
                    Err(err)
                }
            },
        );
        self.finish(
            &request,
            result.as_ref().map(|o| (o.column.as_str(), &o.previous)),
        );

        if let Ok(outcome) = &result {
            tracing::info!(
                row = outcome.row,
                column = %outcome.column,
                value = %outcome.value,
                "Edit applied"
            );
        }
        result
    }

    fn validate_and_write(
        store: &mut TableStore,
        request: &EditRequest,
    ) -> Result<(String, Value, Value)> {
        let column = store.table().column(&request.column)?.clone();

        let previous = match store.set_cell(request.row, &request.column, &request.raw_text) {
            Ok(previous) => previous,
            Err(EngineError::TypeCoercion { column, kind, raw }) => {
                return Err(EngineError::InvalidEdit {
                    row: request.row,
                    column,
                    kind,
                    raw,
                });
            }
            Err(other) => return Err(other),
        };
        let value = store.get_cell(request.row, &request.column)?.clone();
        Ok((column.name, previous, value))
    }

    fn finish(
        &mut self,
        request: &EditRequest,
        result: std::result::Result<(&str, &Value), &EngineError>,
    ) {
        let (accepted, column, previous) = match result {
            Ok((column, previous)) => (true, column.to_owned(), Some(previous.clone())),
            Err(err) => {
                tracing::warn!(row = request.row, column = %request.column, "Edit rejected: {err}");
                (false, request.column.to_string(), None)
            }
        };
        self.last_phase = if accepted {
            EditPhase::Applied
        } else {
            EditPhase::Rejected
        };

        if self.journal.len() == JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        self.journal.push_back(JournalEntry {
            timestamp: Utc::now(),
            row: request.row,
            column,
            raw_text: request.raw_text.clone(),
            accepted,
            previous,
        });
        self.phase = EditPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;
    use crate::table::{RawTable, Tabular as _};

    fn setup() -> anyhow::Result<(TableStore, ViewPipeline, EditController)> {
        let mut store = TableStore::new();
        store.load(RawTable::new(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                vec!["1".into(), "a".into(), "3.5".into()],
                vec!["2".into(), "b".into(), String::new()],
                vec!["1".into(), "a".into(), "3.5".into()],
            ],
        ))?;
        let mut pipeline = ViewPipeline::new();
        pipeline.execute(&store, PipelineConfig::new())?;
        Ok((store, pipeline, EditController::new()))
    }

    #[test]
    fn test_valid_edit_updates_table_and_view() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        let outcome = edits.apply(
            &mut store,
            &mut pipeline,
            EditRequest::new(1, "score", "4.25"),
        )?;
        assert_eq!(outcome.previous, Value::Missing);
        assert_eq!(outcome.value, Value::Float(4.25));
        assert_eq!(store.get_cell(1, &"score".into())?, &Value::Float(4.25));
        assert_eq!(
            outcome.view.row(1).and_then(|r| r.get(2)),
            Some(&Value::Float(4.25))
        );
        assert_eq!(edits.phase(), EditPhase::Idle);
        assert_eq!(edits.last_phase(), EditPhase::Applied);
        Ok(())
    }

    #[test]
    fn test_invalid_edit_is_rejected() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        let revision = store.revision();
        let err = edits
            .apply(&mut store, &mut pipeline, EditRequest::new(0, "score", "x"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidEdit { row: 0, ref column, ref raw, .. }
                if column == "score" && raw == "x"
        ));
        assert_eq!(store.get_cell(0, &"score".into())?, &Value::Float(3.5));
        assert_eq!(store.revision(), revision);
        assert!(!pipeline.is_stale(&store));
        assert_eq!(edits.last_phase(), EditPhase::Rejected);
        assert_eq!(edits.phase(), EditPhase::Idle);
        Ok(())
    }

    #[test]
    fn test_failed_refresh_rolls_back_the_cell() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        pipeline.execute(&store, PipelineConfig::new().with_filter("name", "a"))?;

        // Reload without the filter column behind the pipeline's back
        store.load(RawTable::new(
            vec!["score".into()],
            vec![vec!["1.5".into()]],
        ))?;
        let snapshot = store.table().clone();
        let revision = store.revision();

        let err = edits
            .apply(&mut store, &mut pipeline, EditRequest::new(0, "score", "9"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { ref column } if column == "name"));
        assert_eq!(store.get_cell(0, &"score".into())?, &Value::Float(1.5));
        assert_eq!(store.table(), &snapshot);
        assert_eq!(store.revision(), revision);
        assert_eq!(edits.last_phase(), EditPhase::Rejected);
        assert_eq!(edits.journal().next().map(|e| e.accepted), Some(false));
        Ok(())
    }

    #[test]
    fn test_out_of_range_and_unknown_column() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        assert!(matches!(
            edits.apply(&mut store, &mut pipeline, EditRequest::new(9, "score", "1")),
            Err(EngineError::Index { index: 9, len: 3 })
        ));
        assert!(matches!(
            edits.apply(&mut store, &mut pipeline, EditRequest::new(0, "age", "1")),
            Err(EngineError::UnknownColumn { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_edit_through_sorted_view_hits_origin() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        let view = pipeline
            .execute(&store, PipelineConfig::new().with_sort("id", true))?
            .clone();
        // Descending by id puts canonical row 1 first
        let request = EditRequest::from_view(&view, 0, "name", "z")?;
        assert_eq!(request.row, 1);

        let outcome = edits.apply(&mut store, &mut pipeline, request)?;
        assert_eq!(store.get_cell(1, &"name".into())?, &Value::from("z"));
        assert_eq!(
            outcome.view.row(0).and_then(|r| r.get(1)),
            Some(&Value::from("z"))
        );
        Ok(())
    }

    #[test]
    fn test_grouped_view_is_read_only() -> anyhow::Result<()> {
        let (store, mut pipeline, _) = setup()?;
        let view = pipeline.execute(&store, PipelineConfig::new().with_group("name", "count"))?;
        assert!(matches!(
            EditRequest::from_view(view, 0, "id", "5"),
            Err(EngineError::ReadOnlyView { row: 0 })
        ));
        Ok(())
    }

    #[test]
    fn test_journal_is_capped() -> anyhow::Result<()> {
        let (mut store, mut pipeline, mut edits) = setup()?;
        for i in 0..=JOURNAL_CAPACITY {
            edits.apply(
                &mut store,
                &mut pipeline,
                EditRequest::new(0, "name", format!("v{i}")),
            )?;
        }
        assert_eq!(edits.journal().count(), JOURNAL_CAPACITY);
        let newest = edits.journal().next().map(|e| e.raw_text.clone());
        assert_eq!(newest, Some(format!("v{JOURNAL_CAPACITY}")));
        Ok(())
    }
}
