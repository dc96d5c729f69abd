//! Group/aggregate stage.

use super::view::ViewRow;
use crate::error::{EngineError, Result};
use crate::table::{Column, ColumnKind, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Aggregation applied to every non-key column of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Std,
    First,
    Last,
    NUnique,
}

impl Aggregation {
    pub const ALL: [Self; 10] = [
        Self::Count,
        Self::Sum,
        Self::Mean,
        Self::Median,
        Self::Min,
        Self::Max,
        Self::Std,
        Self::First,
        Self::Last,
        Self::NUnique,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
            Self::First => "first",
            Self::Last => "last",
            Self::NUnique => "nunique",
        }
    }

    /// Whether this aggregation produces a column for input of `kind`.
    pub fn accepts(self, kind: ColumnKind) -> bool {
        match self {
            Self::Sum => kind.is_numeric() || kind == ColumnKind::Boolean,
            Self::Mean | Self::Median | Self::Std => kind.is_numeric(),
            Self::Count | Self::Min | Self::Max | Self::First | Self::Last | Self::NUnique => true,
        }
    }

    /// Kind of the aggregated column.
    pub fn output_kind(self, input: ColumnKind) -> ColumnKind {
        match self {
            Self::Count | Self::NUnique => ColumnKind::Integer,
            Self::Mean | Self::Median | Self::Std => ColumnKind::Float,
            Self::Sum => {
                if input == ColumnKind::Float {
                    ColumnKind::Float
                } else {
                    ColumnKind::Integer
                }
            }
            Self::Min | Self::Max | Self::First | Self::Last => input,
        }
    }

    /// Reduce the values of one column within one group.
    fn apply(self, kind: ColumnKind, values: &[&Value]) -> Value {
        let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_missing()).collect();
        match self {
            Self::Count => count_value(present.len()),
            Self::NUnique => {
                let distinct: HashSet<&Value> = present.iter().copied().collect();
                count_value(distinct.len())
            }
            Self::Sum => {
                if kind == ColumnKind::Float {
                    Value::from(present.iter().filter_map(|v| v.as_f64()).sum::<f64>())
                } else {
                    Value::Integer(
                        present
                            .iter()
                            .map(|v| match v {
                                Value::Integer(i) => *i,
                                Value::Boolean(b) => i64::from(*b),
                                _ => 0,
                            })
                            .fold(0_i64, i64::saturating_add),
                    )
                }
            }
            Self::Mean => Value::from(mean(&numbers(&present))),
            Self::Median => Value::from(quantile(&sorted(numbers(&present)), 0.5)),
            Self::Std => Value::from(sample_std(&numbers(&present))),
            Self::Min => present
                .iter()
                .copied()
                .min_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or_default(),
            Self::Max => present
                .iter()
                .copied()
                .max_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or_default(),
            Self::First => present.first().map(|v| (*v).clone()).unwrap_or_default(),
            Self::Last => present.last().map(|v| (*v).clone()).unwrap_or_default(),
        }
    }
}

impl FromStr for Aggregation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|agg| agg.name() == wanted)
            .ok_or_else(|| EngineError::UnknownAggregation { name: s.to_owned() })
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn count_value(n: usize) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn numbers(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_f64()).collect()
}

pub(crate) fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1); undefined below two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Linear-interpolation quantile of already sorted values.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let lo_v = *sorted.get(lo)?;
    let hi_v = *sorted.get(hi)?;
    Some(lo_v + (hi_v - lo_v) * (pos - lo as f64))
}

/// Partition `rows` by the value at `key`, one output row per group in
/// first-appearance order. Rows with a missing key are dropped.
pub(crate) fn group_rows(
    columns: &[Column],
    rows: &[ViewRow],
    key: usize,
    agg: Aggregation,
) -> Result<(Vec<Column>, Vec<ViewRow>)> {
    let key_column = columns
        .get(key)
        .ok_or_else(|| EngineError::unknown_column(format!("#{key}")))?;

    let value_columns: Vec<(usize, &Column)> = columns
        .iter()
        .enumerate()
        .filter(|(idx, col)| *idx != key && agg.accepts(col.kind))
        .collect();

    let mut out_columns = vec![Column::new(key_column.name.clone(), key_column.kind, 0)];
    out_columns.extend(
        value_columns
            .iter()
            .enumerate()
            .map(|(pos, (_, col))| {
                Column::new(col.name.clone(), agg.output_kind(col.kind), pos + 1)
            }),
    );

    let mut order: Vec<&Value> = Vec::new();
    let mut groups: HashMap<&Value, Vec<&ViewRow>> = HashMap::new();
    for row in rows {
        let Some(k) = row.values.get(key) else {
            continue;
        };
        if k.is_missing() {
            continue;
        }
        groups
            .entry(k)
            .or_insert_with(|| {
                order.push(k);
                Vec::new()
            })
            .push(row);
    }

    let out_rows = order
        .into_iter()
        .map(|k| {
            let members = groups.get(k).map(Vec::as_slice).unwrap_or_default();
            let mut values = Vec::with_capacity(out_columns.len());
            values.push(k.clone());
            for (idx, col) in &value_columns {
                let cells: Vec<&Value> = members
                    .iter()
                    .filter_map(|r| r.values.get(*idx))
                    .collect();
                values.push(agg.apply(col.kind, &cells));
            }
            ViewRow {
                origin: None,
                values,
            }
        })
        .collect();

    Ok((out_columns, out_rows))
}
