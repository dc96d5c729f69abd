//! Descriptive statistics of numeric columns.

use crate::error::{EngineError, Result};
use crate::pipeline::aggregate::{mean, quantile, sample_std, sorted};
use crate::table::{Column, ColumnKind, Table, Tabular, Value};

/// Row labels of the describe table, in order.
pub const STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// Build a table with a `statistic` column followed by one column per
/// numeric input column. Values are rounded to two decimals.
///
/// # Errors
///
/// [`EngineError::NoNumericColumns`] when no integer or float column exists.
pub fn describe(table: &impl Tabular) -> Result<Table> {
    let numeric: Vec<(usize, &Column)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.kind.is_numeric())
        .collect();
    if numeric.is_empty() {
        return Err(EngineError::NoNumericColumns);
    }

    let mut columns = vec![Column::new("statistic", ColumnKind::Text, 0)];
    let mut stats_by_column = Vec::with_capacity(numeric.len());
    for (pos, (idx, col)) in numeric.iter().enumerate() {
        columns.push(Column::new(col.name.clone(), ColumnKind::Float, pos + 1));
        let values = sorted(
            table
                .rows()
                .filter_map(|row| row.get(*idx).and_then(Value::as_f64))
                .collect(),
        );
        stats_by_column.push(column_stats(&values));
    }

    let rows = STATISTICS
        .iter()
        .enumerate()
        .map(|(stat, label)| {
            let mut row = vec![Value::from(*label)];
            row.extend(
                stats_by_column
                    .iter()
                    .map(|stats| Value::from(stats.get(stat).copied().flatten().map(round2))),
            );
            row
        })
        .collect();

    tracing::debug!(columns = numeric.len(), "Described numeric columns");
    Table::from_parts(columns, rows)
}

/// Statistics of one sorted column, in [`STATISTICS`] order.
fn column_stats(values: &[f64]) -> [Option<f64>; 8] {
    [
        Some(values.len() as f64),
        mean(values),
        sample_std(values),
        values.first().copied(),
        quantile(values, 0.25),
        quantile(values, 0.5),
        quantile(values, 0.75),
        values.last().copied(),
    ]
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{NaValues, RawTable};

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

    fn stat(t: &Table, label: &str, column: usize) -> Option<Value> {
        let row = STATISTICS.iter().position(|s| *s == label)?;
        t.row(row).and_then(|r| r.get(column)).cloned()
    }

    #[test]
    fn test_describe_layout() -> anyhow::Result<()> {
        let t = table(
            &["id", "name", "score"],
            &[&["1", "a", "3.5"], &["2", "b", ""], &["1", "a", "3.5"]],
        )?;
        let out = describe(&t)?;

        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["statistic", "id", "score"]);

        let labels: Vec<Value> = out
            .rows()
            .filter_map(|r| r.first().cloned())
            .collect();
        assert_eq!(labels, STATISTICS.map(Value::from));

        assert_eq!(stat(&out, "count", 2), Some(Value::Float(2.0)));
        assert_eq!(stat(&out, "mean", 1), Some(Value::Float(1.33)));
        assert_eq!(stat(&out, "std", 1), Some(Value::Float(0.58)));
        assert_eq!(stat(&out, "std", 2), Some(Value::Float(0.0)));
        assert_eq!(stat(&out, "max", 1), Some(Value::Float(2.0)));
        Ok(())
    }

    #[test]
    fn test_quartiles_interpolate() -> anyhow::Result<()> {
        let t = table(&["v"], &[&["1"], &["2"], &["3"], &["4"]])?;
        let out = describe(&t)?;
        assert_eq!(stat(&out, "25%", 1), Some(Value::Float(1.75)));
        assert_eq!(stat(&out, "50%", 1), Some(Value::Float(2.5)));
        assert_eq!(stat(&out, "75%", 1), Some(Value::Float(3.25)));
        Ok(())
    }

    #[test]
    fn test_single_value_has_missing_std() -> anyhow::Result<()> {
        let t = table(&["v"], &[&["5"]])?;
        let out = describe(&t)?;
        assert_eq!(stat(&out, "std", 1), Some(Value::Missing));
        assert_eq!(stat(&out, "min", 1), Some(Value::Float(5.0)));
        Ok(())
    }

    #[test]
    fn test_no_numeric_columns() -> anyhow::Result<()> {
        let t = table(&["name", "flag"], &[&["a", "true"]])?;
        assert!(matches!(describe(&t), Err(EngineError::NoNumericColumns)));
        Ok(())
    }

    #[test]
    fn test_empty_numeric_column() -> anyhow::Result<()> {
        let out = describe(&Table::from_parts(
            vec![Column::new("v", ColumnKind::Integer, 0)],
            vec![],
        )?)?;
        assert_eq!(stat(&out, "count", 1), Some(Value::Float(0.0)));
        assert_eq!(stat(&out, "mean", 1), Some(Value::Missing));
        Ok(())
    }
}
