//! One open document.
//!
//! [`Session`] owns the [`TableStore`], the [`ViewPipeline`] and the
//! [`EditController`], so every mutation goes through `&mut Session` and
//! reads never interleave with a write.

use crate::edit::{EditController, EditOutcome, EditRequest};
use crate::error::Result;
use crate::io;
use crate::pipeline::{PipelineConfig, ValidationError, View, ViewPipeline, validate_config};
use crate::plot::{self, PlotData, PlotRequest};
use crate::summary::{self, TableInfo};
use crate::table::{ColumnId, NaValues, RawTable, Table, TableStore, Tabular as _};
use std::path::Path;

/// What a summary is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// The canonical dataset
    #[default]
    Table,
    /// The current view
    View,
}

#[derive(Debug, Default)]
pub struct Session {
    store: TableStore,
    pipeline: ViewPipeline,
    edits: EditController,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_na_values(na: NaValues) -> Self {
        Self {
            store: TableStore::with_na_values(na),
            ..Self::default()
        }
    }

    /// Replace the dataset and rebuild the view.
    ///
    /// The current pipeline config is kept if it still fits the new schema,
    /// otherwise the view falls back to the identity config.
    pub fn load(&mut self, raw: RawTable) -> Result<&View> {
        self.store.load(raw)?;
        self.rebuild()
    }

    pub fn load_path(&mut self, path: &Path) -> Result<&View> {
        let raw = io::load_path(path)?;
        self.load(raw)
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.pipeline = ViewPipeline::new();
        tracing::info!("Session cleared");
    }

    fn rebuild(&mut self) -> Result<&View> {
        let config = self.pipeline.config().clone();
        let problems = validate_config(self.store.columns(), &config, self.store.na_values());
        if problems.is_empty() {
            return self.pipeline.execute(&self.store, config);
        }
        tracing::warn!(
            problems = problems.len(),
            "Pipeline config does not fit the loaded table, resetting"
        );
        self.pipeline.execute(&self.store, PipelineConfig::new())
    }

    /// Build a new view from `config`.
    pub fn apply(&mut self, config: PipelineConfig) -> Result<&View> {
        self.pipeline.execute(&self.store, config)
    }

    /// Problems `config` would hit against the loaded table.
    pub fn check(&self, config: &PipelineConfig) -> Vec<ValidationError> {
        validate_config(self.store.columns(), config, self.store.na_values())
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub fn view(&self) -> &View {
        self.pipeline.view()
    }

    pub fn table(&self) -> &Table {
        self.store.table()
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn edits(&self) -> &EditController {
        &self.edits
    }

    pub fn edit(&mut self, request: EditRequest) -> Result<EditOutcome> {
        self.edits
            .apply(&mut self.store, &mut self.pipeline, request)
    }

    /// Edit the cell shown at `view_row` of the current view.
    pub fn edit_view_cell(
        &mut self,
        view_row: usize,
        column: impl Into<ColumnId>,
        raw_text: impl Into<String>,
    ) -> Result<EditOutcome> {
        let request = EditRequest::from_view(self.pipeline.view(), view_row, column, raw_text)?;
        self.edit(request)
    }

    pub fn info(&self, scope: Scope) -> TableInfo {
        match scope {
            Scope::Table => summary::info(self.store.table()),
            Scope::View => summary::info(self.pipeline.view()),
        }
    }

    pub fn describe(&self, scope: Scope) -> Result<Table> {
        match scope {
            Scope::Table => summary::describe(self.store.table()),
            Scope::View => summary::describe(self.pipeline.view()),
        }
    }

    pub fn null_counts(&self, scope: Scope) -> Vec<(String, usize)> {
        match scope {
            Scope::Table => summary::null_counts(self.store.table()),
            Scope::View => summary::null_counts(self.pipeline.view()),
        }
    }

    pub fn plot(&self, request: &PlotRequest) -> Result<PlotData> {
        plot::prepare(self.pipeline.view(), request)
    }

    /// Column names and rows of the current view, as export text.
    pub fn export_rows(&self) -> RawTable {
        self.pipeline.view().to_rows()
    }

    /// Write the current view to `path`.
    pub fn save_view(&self, path: &Path) -> Result<()> {
        io::save_path(self.pipeline.view(), path)
    }

    /// Write the canonical table to `path`.
    pub fn save_table(&self, path: &Path) -> Result<()> {
        io::save_path(self.store.table(), path)
    }
}
