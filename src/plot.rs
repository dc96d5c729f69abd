//! Columnar data for plot consumers.
//!
//! Rendering is someone else's job. [`prepare`] only pulls the requested
//! columns out of a finished [`View`] in a shape a chart widget can draw.

use crate::error::{EngineError, Result};
use crate::pipeline::View;
use crate::table::{ColumnId, ColumnKind, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Line,
    Bar,
    Hist,
    Scatter,
}

impl FromStr for PlotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "hist" | "histogram" => Ok(Self::Hist),
            "scatter" => Ok(Self::Scatter),
            other => Err(format!("unknown plot kind '{other}'")),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Hist => "hist",
            Self::Scatter => "scatter",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub kind: PlotKind,
    /// Category or x-axis column; row position when absent
    pub x: Option<String>,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotData {
    pub kind: PlotKind,
    pub x_label: String,
    pub y_label: String,
    /// Empty for histograms
    pub x: Vec<Value>,
    pub y: Vec<f64>,
}

/// Extract the plotted columns from `view`.
///
/// Rows whose y cell is missing are skipped along with their x value.
///
/// # Errors
///
/// [`EngineError::UnknownColumn`] for absent columns,
/// [`EngineError::TypeCoercion`] when y (or x of a scatter plot) is not
/// numeric.
pub fn prepare(view: &View, request: &PlotRequest) -> Result<PlotData> {
    let y_id = ColumnId::from(&request.y);
    let y_column = view.column(&y_id)?;
    require_numeric(y_column.kind, &y_column.name)?;
    let y_values = view.column_values(&y_id)?;

    let x_source = match (request.kind, &request.x) {
        (PlotKind::Hist, _) => None,
        (kind, Some(name)) => {
            let id = ColumnId::from(name);
            let column = view.column(&id)?;
            if kind == PlotKind::Scatter {
                require_numeric(column.kind, &column.name)?;
            }
            Some((column.name.clone(), view.column_values(&id)?))
        }
        (_, None) => Some(("index".to_owned(), Vec::new())),
    };

    let mut x = Vec::new();
    let mut y = Vec::new();
    for (pos, value) in y_values.iter().enumerate() {
        let Some(v) = value.as_f64() else {
            continue;
        };
        if let Some((_, xs)) = &x_source {
            let xv = if xs.is_empty() {
                Value::Integer(i64::try_from(pos).unwrap_or(i64::MAX))
            } else {
                xs.get(pos).map(|v| (*v).clone()).unwrap_or_default()
            };
            if request.kind == PlotKind::Scatter && xv.is_missing() {
                continue;
            }
            x.push(xv);
        }
        y.push(v);
    }

    Ok(PlotData {
        kind: request.kind,
        x_label: x_source.map(|(label, _)| label).unwrap_or_default(),
        y_label: y_column.name.clone(),
        x,
        y,
    })
}

fn require_numeric(kind: ColumnKind, column: &str) -> Result<()> {
    if kind.is_numeric() {
        Ok(())
    } else {
        Err(EngineError::TypeCoercion {
            column: column.to_owned(),
            kind,
            raw: format!("{} column", kind.label()),
        })
    }
}
