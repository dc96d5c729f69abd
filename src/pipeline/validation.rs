//! Pipeline config validation.
//!
//! Checks a [`PipelineConfig`] against a column schema before it runs, so a
//! UI can list every problem at once instead of failing on the first stage.

use super::aggregate::{Aggregation, group_rows};
use super::spec::{FilterOp, NullHandling, PipelineConfig};
use crate::table::{Column, NaValues};
use std::fmt;

/// Stage a validation problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Sort,
    Group,
    Nulls,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Filter => "Filter",
            Self::Sort => "Sort",
            Self::Group => "Group",
            Self::Nulls => "Nulls",
        })
    }
}

/// Validation error with helpful context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub stage: Option<Stage>,
    pub message: String,
}

impl ValidationError {
    fn new(stage: Option<Stage>, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(Some(stage), message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{stage}: {}", self.message),
            None => write!(f, "Config: {}", self.message),
        }
    }
}

/// Validate a pipeline config against the columns it will run on.
///
/// An empty result means [`build_view`](super::build_view) will not fail
/// with a column, aggregation or coercion error.
pub fn validate_config(
    columns: &[Column],
    config: &PipelineConfig,
    na: &NaValues,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != super::spec::CONFIG_VERSION {
        errors.push(ValidationError::new(
            None,
            format!(
                "Unsupported config version '{}', expected '{}'",
                config.version,
                super::spec::CONFIG_VERSION
            ),
        ));
    }

    if let Some(filter) = &config.filter {
        match columns.iter().find(|c| c.name == filter.column) {
            None => errors.push(missing_column(Stage::Filter, &filter.column)),
            Some(col) => {
                if filter.op != FilterOp::Contains
                    && !na.is_missing(&filter.value)
                    && col.kind.coerce(&filter.value, na).is_none()
                {
                    errors.push(ValidationError::stage(
                        Stage::Filter,
                        format!(
                            "Value '{}' is not a valid {} for column '{}'",
                            filter.value, col.kind, col.name
                        ),
                    ));
                }
            }
        }
    }

    if let Some(sort) = &config.sort {
        for key in &sort.keys {
            if !columns.iter().any(|c| c.name == key.column) {
                errors.push(missing_column(Stage::Sort, &key.column));
            }
        }
    }

    // Columns seen by the null stage, after grouping reshaped them
    let mut current = columns.to_vec();
    if let Some(group) = &config.group {
        let key = columns.iter().position(|c| c.name == group.column);
        if key.is_none() {
            errors.push(missing_column(Stage::Group, &group.column));
        }
        match group.aggregation.parse::<Aggregation>() {
            Ok(agg) => {
                if let Some(key) = key
                    && let Ok((grouped, _)) = group_rows(columns, &[], key, agg)
                {
                    current = grouped;
                }
            }
            Err(err) => errors.push(ValidationError::stage(Stage::Group, err.to_string())),
        }
    }

    if let NullHandling::Fill { value: Some(raw) } = &config.nulls {
        for col in &current {
            if !matches!(col.kind.coerce(raw, na), Some(v) if !v.is_missing()) {
                errors.push(ValidationError::stage(
                    Stage::Nulls,
                    format!(
                        "Fill value '{raw}' is not a valid {} for column '{}'",
                        col.kind, col.name
                    ),
                ));
            }
        }
    }

    errors
}

fn missing_column(stage: Stage, column: &str) -> ValidationError {
    ValidationError::stage(stage, format!("Column '{column}' not found in table"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", ColumnKind::Integer, 0),
            Column::new("name", ColumnKind::Text, 1),
            Column::new("score", ColumnKind::Float, 2),
        ]
    }

    #[test]
    fn test_valid_config() {
        let config = PipelineConfig::new()
            .with_filter("name", "a")
            .with_sort("score", true)
            .with_group("name", "mean")
            .with_nulls(NullHandling::Fill {
                value: Some("0".to_owned()),
            })
            .with_dedupe(true);
        let errors = validate_config(&columns(), &config, &NaValues::default());
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_collects_every_problem() {
        let config = PipelineConfig::new()
            .with_filter("id", "abc")
            .with_sort("age", false)
            .with_group("team", "average");
        let errors = validate_config(&columns(), &config, &NaValues::default());
        let stages: Vec<Option<Stage>> = errors.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            [
                Some(Stage::Filter),
                Some(Stage::Sort),
                Some(Stage::Group),
                Some(Stage::Group)
            ]
        );
        assert_eq!(
            errors.get(1).map(ToString::to_string).as_deref(),
            Some("Sort: Column 'age' not found in table")
        );
    }

    #[test]
    fn test_fill_checked_against_grouped_columns() {
        let config = PipelineConfig::new()
            .with_group("name", "count")
            .with_nulls(NullHandling::Fill {
                value: Some("x".to_owned()),
            });
        let errors = validate_config(&columns(), &config, &NaValues::default());
        // name is text and accepts "x"; id and score are counts now
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.stage == Some(Stage::Nulls)));
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = PipelineConfig::new();
        config.version = "9.9".to_owned();
        let errors = validate_config(&columns(), &config, &NaValues::default());
        assert_eq!(errors.len(), 1);
        assert!(errors.first().is_some_and(|e| e.stage.is_none()));
    }
}
