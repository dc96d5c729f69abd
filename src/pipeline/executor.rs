//! Pipeline execution engine.
//!
//! Runs a [`PipelineConfig`] against the canonical table, applying the
//! stages in their fixed order (filter, sort, group, null handling, dedupe)
//! and producing a fresh [`View`] plus a [`ViewReport`].

use super::aggregate::{Aggregation, group_rows};
use super::spec::{FilterOp, FilterSpec, NullHandling, PipelineConfig, SortSpec};
use super::view::{View, ViewRow};
use crate::error::{EngineError, Result};
use crate::table::schema::position_of;
use crate::table::{Column, NaValues, Table, TableStore, Tabular as _, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Report generated after each execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReport {
    pub rows_before: usize,
    pub columns_before: usize,
    pub rows_after: usize,
    pub columns_after: usize,
    pub stages_applied: usize,
    pub duration: Duration,
}

impl ViewReport {
    pub fn summary(&self) -> String {
        format!(
            "View built: {} → {} rows, {} → {} columns, {} stages, {:.3}s",
            self.rows_before,
            self.rows_after,
            self.columns_before,
            self.columns_after,
            self.stages_applied,
            self.duration.as_secs_f64()
        )
    }
}

/// Build a view of `table` from `config`.
///
/// The result depends only on the two arguments.
///
/// # Errors
///
/// [`EngineError::UnknownColumn`] for a stage naming an absent column,
/// [`EngineError::UnknownAggregation`] for an unsupported aggregation,
/// [`EngineError::TypeCoercion`] when a filter or fill value does not fit
/// its column.
pub fn build_view(table: &Table, config: &PipelineConfig) -> Result<View> {
    build_view_with(table, config, &NaValues::default()).map(|(view, _)| view)
}

pub(crate) fn build_view_with(
    table: &Table,
    config: &PipelineConfig,
    na: &NaValues,
) -> Result<(View, ViewReport)> {
    let start = Instant::now();
    let view = View::of_table(table);
    let (mut columns, mut rows) = (view.columns().to_vec(), view.view_rows().to_vec());
    let mut grouped = false;
    let mut stages_applied = 0;

    if let Some(filter) = &config.filter {
        rows = apply_filter(&columns, rows, filter, na)?;
        stages_applied += 1;
        tracing::debug!(rows = rows.len(), column = %filter.column, "Filter applied");
    }

    if let Some(sort) = &config.sort {
        apply_sort(&columns, &mut rows, sort)?;
        stages_applied += 1;
    }

    if let Some(group) = &config.group {
        let agg: Aggregation = group.aggregation.parse()?;
        let key = position_of(&columns, &group.column)?;
        (columns, rows) = group_rows(&columns, &rows, key, agg)?;
        grouped = true;
        stages_applied += 1;
        tracing::debug!(groups = rows.len(), %agg, "Group applied");
    }

    match &config.nulls {
        NullHandling::None => {}
        NullHandling::Drop => {
            rows.retain(|row| !row.values.iter().any(Value::is_missing));
            stages_applied += 1;
        }
        NullHandling::Fill { value } => {
            fill_missing(&columns, &mut rows, value.as_deref(), na)?;
            stages_applied += 1;
        }
    }

    if config.dedupe {
        rows = dedupe(rows);
        stages_applied += 1;
    }

    let report = ViewReport {
        rows_before: table.row_count(),
        columns_before: table.column_count(),
        rows_after: rows.len(),
        columns_after: columns.len(),
        stages_applied,
        duration: start.elapsed(),
    };
    Ok((View::new(columns, rows, grouped), report))
}

fn apply_filter(
    columns: &[Column],
    rows: Vec<ViewRow>,
    filter: &FilterSpec,
    na: &NaValues,
) -> Result<Vec<ViewRow>> {
    let idx = position_of(columns, &filter.column)?;
    let column = columns
        .get(idx)
        .ok_or_else(|| EngineError::unknown_column(filter.column.clone()))?;

    let predicate: Box<dyn Fn(&Value) -> bool> = if filter.op == FilterOp::Contains {
        let needle = filter.value.clone();
        Box::new(move |v: &Value| !v.is_missing() && v.to_string().contains(&needle))
    } else {
        let target = filter_target(column, &filter.value, na)?;
        let op = filter.op;
        Box::new(move |v: &Value| compare(op, v, &target))
    };

    Ok(rows
        .into_iter()
        .filter(|row| row.values.get(idx).is_some_and(|v| predicate(v)))
        .collect())
}

/// Filter value coerced into the column's kind.
fn filter_target(column: &Column, raw: &str, na: &NaValues) -> Result<Value> {
    let coerced = if na.is_missing(raw) {
        Some(Value::Missing)
    } else {
        column.kind.coerce(raw, na)
    };
    coerced.ok_or_else(|| EngineError::TypeCoercion {
        column: column.name.clone(),
        kind: column.kind,
        raw: raw.to_owned(),
    })
}

fn compare(op: FilterOp, value: &Value, target: &Value) -> bool {
    match op {
        FilterOp::Eq => value == target,
        FilterOp::Ne => value != target,
        // Ordering comparisons never match missing cells
        _ if value.is_missing() || target.is_missing() => false,
        FilterOp::Lt => value.sort_cmp(target) == Ordering::Less,
        FilterOp::Le => value.sort_cmp(target) != Ordering::Greater,
        FilterOp::Gt => value.sort_cmp(target) == Ordering::Greater,
        FilterOp::Ge => value.sort_cmp(target) != Ordering::Less,
        FilterOp::Contains => value.to_string().contains(&target.to_string()),
    }
}

fn apply_sort(columns: &[Column], rows: &mut [ViewRow], sort: &SortSpec) -> Result<()> {
    let keys: Vec<(usize, bool)> = if sort.keys.is_empty() {
        // No key configured: first column, ascending
        if columns.is_empty() {
            return Ok(());
        }
        vec![(0, false)]
    } else {
        sort.keys
            .iter()
            .map(|k| -> Result<(usize, bool)> {
                Ok((position_of(columns, &k.column)?, k.descending))
            })
            .collect::<Result<_>>()?
    };

    // slice::sort_by is stable, ties keep their input order
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|(idx, descending)| {
                let (Some(x), Some(y)) = (a.values.get(*idx), b.values.get(*idx)) else {
                    return Ordering::Equal;
                };
                match (x.is_missing(), y.is_missing()) {
                    // Missing stays last in both directions
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    _ if *descending => y.sort_cmp(x),
                    _ => x.sort_cmp(y),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    tracing::debug!(keys = keys.len(), "Sort applied");
    Ok(())
}

fn fill_missing(
    columns: &[Column],
    rows: &mut [ViewRow],
    value: Option<&str>,
    na: &NaValues,
) -> Result<()> {
    let fills = columns
        .iter()
        .map(|col| match value {
            None => Ok(col.kind.fill_default()),
            Some(raw) => match col.kind.coerce(raw, na) {
                Some(v) if !v.is_missing() => Ok(v),
                _ => Err(EngineError::TypeCoercion {
                    column: col.name.clone(),
                    kind: col.kind,
                    raw: raw.to_owned(),
                }),
            },
        })
        .collect::<Result<Vec<Value>>>()?;

    for row in rows {
        for (cell, fill) in row.values.iter_mut().zip(&fills) {
            if cell.is_missing() {
                cell.clone_from(fill);
            }
        }
    }
    Ok(())
}

/// Keep the first of each set of fully equal rows.
pub(crate) fn dedupe(rows: Vec<ViewRow>) -> Vec<ViewRow> {
    let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row.values.clone()))
        .collect()
}

/// Stateful wrapper that remembers the last config and the view it produced.
#[derive(Debug, Default)]
pub struct ViewPipeline {
    config: PipelineConfig,
    view: View,
    last_report: Option<ViewReport>,
}

impl ViewPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a view from `config` and remember both.
    ///
    /// On failure the previous config and view are kept.
    ///
    /// # Errors
    ///
    /// See [`build_view`].
    pub fn execute(&mut self, store: &TableStore, config: PipelineConfig) -> Result<&View> {
        let (view, report) = build_view_with(store.table(), &config, store.na_values())?;
        tracing::debug!("{}", report.summary());
        self.view = view.with_revision(store.revision());
        self.config = config;
        self.last_report = Some(report);
        Ok(&self.view)
    }

    /// Re-run the last-used config against the current table.
    ///
    /// # Errors
    ///
    /// See [`build_view`].
    pub fn refresh(&mut self, store: &TableStore) -> Result<&View> {
        let config = self.config.clone();
        self.execute(store, config)
    }

    /// Whether the table changed since the current view was built.
    pub fn is_stale(&self, store: &TableStore) -> bool {
        self.view.source_revision() != store.revision()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn last_report(&self) -> Option<&ViewReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawTable, Tabular};

    fn table(columns: &[&str], rows: &[&[&str]]) -> anyhow::Result<Table> {
        Ok(Table::from_raw(
            RawTable::new(
                columns.iter().map(|s| (*s).to_owned()).collect(),
                rows.iter()
                    .map(|r| r.iter().map(|s| (*s).to_owned()).collect())
                    .collect(),
            ),
            &NaValues::default(),
        )?)
    }

    fn scores() -> anyhow::Result<Table> {
        table(
            &["id", "name", "score"],
            &[&["1", "a", "3.5"], &["2", "b", ""], &["1", "a", "3.5"]],
        )
    }

    fn column(view: &View, name: &str) -> Vec<Value> {
        view.column_values(&name.into())
            .map(|vals| vals.into_iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_identity_config_reproduces_table() -> anyhow::Result<()> {
        let t = scores()?;
        let view = build_view(&t, &PipelineConfig::new())?;
        assert_eq!(view.to_rows(), t.to_rows());
        assert_eq!(view.columns(), t.columns());
        Ok(())
    }

    #[test]
    fn test_filter_on_text_column() -> anyhow::Result<()> {
        let view = build_view(&scores()?, &PipelineConfig::new().with_filter("name", "a"))?;
        assert_eq!(view.row_count(), 2);
        assert_eq!(view.origin(1)?, 2);
        Ok(())
    }

    #[test]
    fn test_filter_coerces_numeric_value() -> anyhow::Result<()> {
        let view = build_view(&scores()?, &PipelineConfig::new().with_filter("score", "3.50"))?;
        assert_eq!(view.row_count(), 2);

        let err = build_view(&scores()?, &PipelineConfig::new().with_filter("id", "one"))
            .unwrap_err();
        assert!(matches!(err, EngineError::TypeCoercion { ref column, .. } if column == "id"));
        Ok(())
    }

    #[test]
    fn test_filter_unknown_column() -> anyhow::Result<()> {
        let err = build_view(&scores()?, &PipelineConfig::new().with_filter("age", "3"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { ref column } if column == "age"));
        Ok(())
    }

    #[test]
    fn test_filter_ordering_ops_skip_missing() -> anyhow::Result<()> {
        let config = PipelineConfig::new().with_filter_op("score", FilterOp::Lt, "10");
        let view = build_view(&scores()?, &config)?;
        assert_eq!(view.row_count(), 2);

        let config = PipelineConfig::new().with_filter("score", "");
        let view = build_view(&scores()?, &config)?;
        assert_eq!(column(&view, "id"), [Value::Integer(2)]);
        Ok(())
    }

    #[test]
    fn test_sort_is_stable() -> anyhow::Result<()> {
        let t = table(
            &["k", "tag"],
            &[&["2", "x"], &["1", "y"], &["2", "z"], &["1", "w"]],
        )?;
        let view = build_view(&t, &PipelineConfig::new().with_sort("k", false))?;
        assert_eq!(
            column(&view, "tag"),
            [
                Value::from("y"),
                Value::from("w"),
                Value::from("x"),
                Value::from("z")
            ]
        );

        let view = build_view(&t, &PipelineConfig::new().with_sort("k", true))?;
        assert_eq!(
            column(&view, "tag"),
            [
                Value::from("x"),
                Value::from("z"),
                Value::from("y"),
                Value::from("w")
            ]
        );
        Ok(())
    }

    #[test]
    fn test_default_sort_uses_first_column() -> anyhow::Result<()> {
        let t = table(&["b", "a"], &[&["3", "x"], &["", "y"], &["1", "z"]])?;
        let view = build_view(&t, &PipelineConfig::new().with_default_sort())?;
        assert_eq!(
            column(&view, "b"),
            [Value::Integer(1), Value::Integer(3), Value::Missing]
        );
        Ok(())
    }

    #[test]
    fn test_missing_sorts_last_when_descending() -> anyhow::Result<()> {
        let t = table(&["v"], &[&["1"], &[""], &["5"]])?;
        let view = build_view(&t, &PipelineConfig::new().with_sort("v", true))?;
        assert_eq!(
            column(&view, "v"),
            [Value::Integer(5), Value::Integer(1), Value::Missing]
        );
        Ok(())
    }

    #[test]
    fn test_group_count() -> anyhow::Result<()> {
        let view = build_view(&scores()?, &PipelineConfig::new().with_group("name", "count"))?;
        assert!(view.is_grouped());
        assert_eq!(column(&view, "name"), [Value::from("a"), Value::from("b")]);
        assert_eq!(column(&view, "id"), [Value::Integer(2), Value::Integer(1)]);
        assert_eq!(column(&view, "score"), [Value::Integer(2), Value::Integer(0)]);
        Ok(())
    }

    #[test]
    fn test_group_unknown_aggregation() -> anyhow::Result<()> {
        let err = build_view(&scores()?, &PipelineConfig::new().with_group("name", "avg"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownAggregation { ref name } if name == "avg"));
        Ok(())
    }

    #[test]
    fn test_drop_and_fill() -> anyhow::Result<()> {
        let dropped = build_view(
            &scores()?,
            &PipelineConfig::new().with_nulls(NullHandling::Drop),
        )?;
        assert_eq!(dropped.row_count(), 2);

        let filled = build_view(
            &scores()?,
            &PipelineConfig::new().with_nulls(NullHandling::Fill { value: None }),
        )?;
        assert_eq!(
            column(&filled, "score"),
            [Value::Float(3.5), Value::Float(0.0), Value::Float(3.5)]
        );
        Ok(())
    }

    #[test]
    fn test_fill_with_constant_must_fit_every_column() -> anyhow::Result<()> {
        let t = table(&["n", "s", "e"], &[&["1", "", ""], &["", "x", ""]])?;
        let config = PipelineConfig::new().with_nulls(NullHandling::Fill {
            value: Some("7".to_owned()),
        });
        let view = build_view(&t, &config)?;
        assert_eq!(column(&view, "n"), [Value::Integer(1), Value::Integer(7)]);
        assert_eq!(column(&view, "s"), [Value::from("7"), Value::from("x")]);
        // Null-kind columns take the constant as text
        assert_eq!(column(&view, "e"), [Value::from("7"), Value::from("7")]);

        let t = table(&["n"], &[&["1"], &[""]])?;
        let config = PipelineConfig::new().with_nulls(NullHandling::Fill {
            value: Some("seven".to_owned()),
        });
        assert!(matches!(
            build_view(&t, &config),
            Err(EngineError::TypeCoercion { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_dedupe_is_idempotent() -> anyhow::Result<()> {
        let once = build_view(&scores()?, &PipelineConfig::new().with_dedupe(true))?;
        assert_eq!(once.row_count(), 2);
        let twice = dedupe(once.view_rows().to_vec());
        assert_eq!(twice, once.view_rows());
        Ok(())
    }

    #[test]
    fn test_undefined_group_sums_are_dropped() -> anyhow::Result<()> {
        let t = table(
            &["k", "v"],
            &[&["a", "inf"], &["a", "-inf"], &["b", "inf"], &["b", "-inf"]],
        )?;
        let view = build_view(
            &t,
            &PipelineConfig::new()
                .with_group("k", "sum")
                .with_nulls(NullHandling::Drop)
                .with_dedupe(true),
        )?;
        assert!(view.is_empty());
        Ok(())
    }

    #[test]
    fn test_stage_order_is_fixed() -> anyhow::Result<()> {
        // Dedupe runs after fill, so the filled row is compared as filled
        let t = table(&["a", "b"], &[&["1", ""], &["1", "0"]])?;
        let config = PipelineConfig::new()
            .with_dedupe(true)
            .with_nulls(NullHandling::Fill { value: None });
        let view = build_view(&t, &config)?;
        assert_eq!(view.row_count(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_table_gives_empty_view() -> anyhow::Result<()> {
        let t = table(&["a"], &[])?;
        let view = build_view(
            &t,
            &PipelineConfig::new()
                .with_filter("a", "1")
                .with_default_sort()
                .with_group("a", "sum")
                .with_dedupe(true),
        )?;
        assert!(view.is_empty());
        Ok(())
    }

    #[test]
    fn test_pipeline_tracks_staleness() -> anyhow::Result<()> {
        let mut store = TableStore::new();
        store.load(scores()?.to_rows())?;
        let mut pipeline = ViewPipeline::new();
        pipeline.execute(&store, PipelineConfig::new().with_filter("name", "a"))?;
        assert!(!pipeline.is_stale(&store));

        store.set_cell(0, &"name".into(), "b")?;
        assert!(pipeline.is_stale(&store));

        let view = pipeline.refresh(&store)?;
        assert_eq!(view.row_count(), 1);
        assert!(!pipeline.is_stale(&store));
        Ok(())
    }

    #[test]
    fn test_failed_execute_keeps_previous_view() -> anyhow::Result<()> {
        let mut store = TableStore::new();
        store.load(scores()?.to_rows())?;
        let mut pipeline = ViewPipeline::new();
        pipeline.execute(&store, PipelineConfig::new().with_dedupe(true))?;

        let result = pipeline.execute(&store, PipelineConfig::new().with_filter("x", "1"));
        assert!(result.is_err());
        assert!(pipeline.config().dedupe);
        assert_eq!(pipeline.view().row_count(), 2);
        Ok(())
    }
}
