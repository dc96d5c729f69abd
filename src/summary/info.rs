//! Schema and null-count summaries.

use crate::table::Tabular;
use serde::Serialize;
use std::fmt;

/// One line of the info summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaEntry {
    pub column: String,
    pub non_null_count: usize,
    pub kind_label: &'static str,
}

impl SchemaEntry {
    pub fn non_null_label(&self) -> String {
        format!("{} non-null", self.non_null_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub row_count: usize,
    pub column_count: usize,
    pub entries: Vec<SchemaEntry>,
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows, {} columns", self.row_count, self.column_count)?;
        let width = self
            .entries
            .iter()
            .map(|e| e.column.chars().count())
            .max()
            .unwrap_or(0);
        for (idx, entry) in self.entries.iter().enumerate() {
            writeln!(
                f,
                "{idx:>3}  {:<width$}  {:<14}  {}",
                entry.column,
                entry.non_null_label(),
                entry.kind_label
            )?;
        }
        Ok(())
    }
}

/// Non-null count and dtype label of every column, in schema order.
pub fn schema_summary(table: &impl Tabular) -> Vec<SchemaEntry> {
    let nulls = null_counts(table);
    table
        .columns()
        .iter()
        .zip(nulls)
        .map(|(col, (_, missing))| SchemaEntry {
            column: col.name.clone(),
            non_null_count: table.row_count().saturating_sub(missing),
            kind_label: col.kind.label(),
        })
        .collect()
}

pub fn info(table: &impl Tabular) -> TableInfo {
    TableInfo {
        row_count: table.row_count(),
        column_count: table.column_count(),
        entries: schema_summary(table),
    }
}

/// Missing cells per column, in schema order.
pub fn null_counts(table: &impl Tabular) -> Vec<(String, usize)> {
    let mut counts = vec![0_usize; table.column_count()];
    for row in table.rows() {
        for (count, value) in counts.iter_mut().zip(row) {
            if value.is_missing() {
                *count += 1;
            }
        }
    }
    table
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .zip(counts)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{NaValues, RawTable, Table};

    fn table() -> anyhow::Result<Table> {
        Ok(Table::from_raw(
            RawTable::new(
                vec!["id".into(), "name".into(), "score".into()],
                vec![
                    vec!["1".into(), "a".into(), "3.5".into()],
                    vec!["2".into(), "b".into(), String::new()],
                ],
            ),
            &NaValues::default(),
        )?)
    }

    #[test]
    fn test_schema_summary() -> anyhow::Result<()> {
        let entries = schema_summary(&table()?);
        let labels: Vec<(&str, String, &str)> = entries
            .iter()
            .map(|e| (e.column.as_str(), e.non_null_label(), e.kind_label))
            .collect();
        assert_eq!(
            labels,
            [
                ("id", "2 non-null".to_owned(), "int64"),
                ("name", "2 non-null".to_owned(), "object"),
                ("score", "1 non-null".to_owned(), "float64"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_null_counts_in_schema_order() -> anyhow::Result<()> {
        let counts = null_counts(&table()?);
        assert_eq!(
            counts,
            [("id".to_owned(), 0), ("name".to_owned(), 0), ("score".to_owned(), 1)]
        );
        Ok(())
    }

    #[test]
    fn test_info_display() -> anyhow::Result<()> {
        let text = info(&table()?).to_string();
        assert!(text.starts_with("2 rows, 3 columns"));
        assert!(text.contains("1 non-null"));
        Ok(())
    }

    #[test]
    fn test_empty_table() {
        let t = Table::default();
        assert!(schema_summary(&t).is_empty());
        assert_eq!(info(&t).row_count, 0);
    }
}
