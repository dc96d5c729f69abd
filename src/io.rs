//! File loaders and exporters.
//!
//! Formats are picked by extension:
//!
//! | Extension        | Load                  | Save              |
//! |------------------|-----------------------|-------------------|
//! | `.csv`           | `csv`, comma          | `csv`, comma      |
//! | `.tsv`, `.tab`   | `csv`, tab            | `csv`, tab        |
//! | `.xlsx`, `.xlsm` | `calamine`, 1st sheet | `rust_xlsxwriter` |
//!
//! The first row is always the header. Loaders return an untyped
//! [`RawTable`]; kind inference happens in [`TableStore::load`].
//!
//! [`TableStore::load`]: crate::table::TableStore::load

use crate::error::{EngineError, Result};
use crate::table::{RawTable, Tabular, Value};
use calamine::{Data, Reader as _, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Workbook};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl FileFormat {
    /// # Errors
    ///
    /// [`EngineError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" | "xlsm" => Ok(Self::Xlsx),
            _ => Err(EngineError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            Self::Csv | Self::Xlsx => b',',
        }
    }
}

/// Load a file into a raw text grid.
pub fn load_path(path: &Path) -> Result<RawTable> {
    let format = FileFormat::from_path(path)?;
    let raw = match format {
        FileFormat::Csv | FileFormat::Tsv => {
            read_delimited(std::fs::File::open(path)?, format.delimiter())?
        }
        FileFormat::Xlsx => read_xlsx(path)?,
    };
    tracing::info!(
        path = %path.display(),
        rows = raw.rows.len(),
        columns = raw.columns.len(),
        "Read file"
    );
    Ok(raw)
}

/// Parse delimited text. Rows keep their own length; a ragged file is
/// reported by the table loader, not here.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(RawTable::default());
    };
    let columns = header.iter().map(str::to_owned).collect();
    let rows: Vec<Vec<String>> = records
        .map(|record| -> Result<Vec<String>> {
            Ok(record?.iter().map(str::to_owned).collect())
        })
        .collect::<Result<_>>()?;
    Ok(RawTable::new(columns, rows))
}

fn read_xlsx(path: &Path) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(RawTable::default());
    };
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
    let Some(columns) = rows.next() else {
        return Ok(RawTable::default());
    };
    Ok(RawTable::new(columns, rows.collect()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("{e:?}"),
        Data::DateTime(dt) => dt.as_f64().to_string(),
    }
}

/// Write a table or view to `path`. Missing cells are left empty.
pub fn save_path(table: &impl Tabular, path: &Path) -> Result<()> {
    let format = FileFormat::from_path(path)?;
    match format {
        FileFormat::Csv | FileFormat::Tsv => {
            let file = std::fs::File::create(path)?;
            write_delimited(table, file, format.delimiter())?;
        }
        FileFormat::Xlsx => write_xlsx(table, path)?,
    }
    tracing::info!(path = %path.display(), rows = table.row_count(), "Exported table");
    Ok(())
}

pub fn write_delimited<W: Write>(table: &impl Tabular, writer: W, delimiter: u8) -> Result<()> {
    let raw = table.to_rows();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    writer.write_record(&raw.columns)?;
    for row in &raw.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(table: &impl Tabular, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    // Out-of-range positions saturate and fail inside rust_xlsxwriter
    let col_of = |c: usize| u16::try_from(c).unwrap_or(u16::MAX);
    for (c, column) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col_of(c), &column.name, &header)?;
    }
    for (r, row) in table.rows().enumerate() {
        let xr = u32::try_from(r + 1).unwrap_or(u32::MAX);
        for (c, value) in row.iter().enumerate() {
            match value {
                Value::Missing => {}
                Value::Integer(i) => {
                    worksheet.write_number(xr, col_of(c), *i as f64)?;
                }
                Value::Float(f) => {
                    worksheet.write_number(xr, col_of(c), *f)?;
                }
                Value::Boolean(b) => {
                    worksheet.write_boolean(xr, col_of(c), *b)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(xr, col_of(c), s)?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{NaValues, Table};

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.CSV")).ok(), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path(Path::new("a.tab")).ok(), Some(FileFormat::Tsv));
        assert_eq!(FileFormat::from_path(Path::new("a.xlsm")).ok(), Some(FileFormat::Xlsx));
        assert!(matches!(
            FileFormat::from_path(Path::new("a.parquet")),
            Err(EngineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_read_quoted_csv() -> anyhow::Result<()> {
        let raw = read_delimited("name,note\na,\"x, y\"\nb,\n".as_bytes(), b',')?;
        assert_eq!(raw.columns, ["name", "note"]);
        assert_eq!(raw.rows, [vec!["a", "x, y"], vec!["b", ""]]);
        Ok(())
    }

    #[test]
    fn test_ragged_csv_reaches_table_loader() -> anyhow::Result<()> {
        let raw = read_delimited("a,b\n1\n".as_bytes(), b',')?;
        let err = Table::from_raw(raw, &NaValues::default()).unwrap_err();
        assert!(matches!(err, EngineError::Load(_)));
        Ok(())
    }

    #[test]
    fn test_empty_input() -> anyhow::Result<()> {
        assert_eq!(read_delimited("".as_bytes(), b',')?, RawTable::default());
        Ok(())
    }

    #[test]
    fn test_tsv_round_trip_through_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.tsv");
        let table = Table::from_raw(
            RawTable::new(
                vec!["id".into(), "score".into()],
                vec![vec!["1".into(), "3.5".into()], vec!["2".into(), "NA".into()]],
            ),
            &NaValues::default(),
        )?;
        save_path(&table, &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "id\tscore\n1\t3.5\n2\t\n");

        let reloaded = Table::from_raw(load_path(&path)?, &NaValues::default())?;
        assert_eq!(reloaded, table);
        Ok(())
    }

    #[test]
    fn test_xlsx_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.xlsx");
        let table = Table::from_raw(
            RawTable::new(
                vec!["name".into(), "n".into(), "ok".into()],
                vec![
                    vec!["a".into(), "1".into(), "true".into()],
                    vec!["b".into(), String::new(), "false".into()],
                ],
            ),
            &NaValues::default(),
        )?;
        save_path(&table, &path)?;

        let reloaded = Table::from_raw(load_path(&path)?, &NaValues::default())?;
        assert_eq!(reloaded, table);
        Ok(())
    }
}
