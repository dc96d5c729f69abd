use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use gridwork::config::{self, Settings};
use gridwork::edit::EditRequest;
use gridwork::error::EngineError;
use gridwork::logging;
use gridwork::pipeline::{FilterOp, NullHandling, Page, PipelineConfig, View, ViewRow};
use gridwork::plot::{PlotKind, PlotRequest};
use gridwork::session::{Scope, Session};
use gridwork::table::{Column, Table, Tabular as _};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gridwork", about = "Inspect, transform and edit tabular files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print row/column counts and per-column non-null counts and dtypes
    Info {
        /// Input file (CSV, TSV or XLSX)
        file: PathBuf,
    },
    /// Print the first rows of a file
    Head {
        file: PathBuf,

        /// Number of rows. Defaults to the `head_rows` setting.
        #[arg(short = 'n', long)]
        rows: Option<usize>,
    },
    /// Print count, mean, std, min, quartiles and max of numeric columns
    Describe {
        file: PathBuf,

        #[command(flatten)]
        stages: StageArgs,
    },
    /// Print missing values per column
    Nulls {
        file: PathBuf,

        #[command(flatten)]
        stages: StageArgs,
    },
    /// Run the view pipeline and print one page, or save the whole view
    View {
        file: PathBuf,

        #[command(flatten)]
        stages: StageArgs,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Rows per page. Defaults to the `page_size` setting.
        #[arg(long)]
        page_size: Option<usize>,

        /// Write the view to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the effective pipeline config as JSON
        #[arg(long)]
        save_pipeline: Option<PathBuf>,
    },
    /// Set one cell and save the edited table
    Edit {
        file: PathBuf,

        /// Canonical row index (zero-based)
        #[arg(long)]
        row: usize,

        /// Column name
        #[arg(long)]
        column: String,

        /// New cell text, coerced to the column's type
        #[arg(long)]
        value: String,

        /// Output file. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the columnar data a chart of the view would draw, as JSON
    Plot {
        file: PathBuf,

        #[command(flatten)]
        stages: StageArgs,

        /// line, bar, hist or scatter
        #[arg(long, default_value = "line")]
        kind: PlotKind,

        /// X column; row position when omitted
        #[arg(long)]
        x: Option<String>,

        #[arg(long)]
        y: String,
    },
    /// Show the settings and log file locations and the effective settings
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

/// Pipeline stage flags shared by the view-producing commands.
#[derive(Args, Default)]
pub struct StageArgs {
    /// Load the pipeline config from a JSON file (other stage flags are ignored)
    #[arg(long)]
    pipeline: Option<PathBuf>,

    /// Filter as `column=value`, `column>value`, `column~text`, ...
    #[arg(long)]
    filter: Option<String>,

    /// Sort key; repeat for secondary keys. Prefix with `-` for descending.
    #[arg(long, allow_hyphen_values = true)]
    sort: Vec<String>,

    /// Group by this column
    #[arg(long, requires = "agg")]
    group: Option<String>,

    /// Aggregation for --group (count, sum, mean, median, min, max, std, first, last, nunique)
    #[arg(long)]
    agg: Option<String>,

    /// Drop rows with missing values
    #[arg(long, conflicts_with = "fill")]
    dropna: bool,

    /// Fill missing values; with no value, each column's default (0, 0.0, "", false)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    fill: Option<String>,

    /// Remove duplicate rows
    #[arg(long)]
    dedupe: bool,
}

impl StageArgs {
    fn is_empty(&self) -> bool {
        self.pipeline.is_none()
            && self.filter.is_none()
            && self.sort.is_empty()
            && self.group.is_none()
            && !self.dropna
            && self.fill.is_none()
            && !self.dedupe
    }

    /// Effective config: a pipeline file, else the flags, else the default.
    fn to_config(&self, default: &PipelineConfig) -> Result<PipelineConfig> {
        if let Some(path) = &self.pipeline {
            return PipelineConfig::from_file(path)
                .with_context(|| format!("Pipeline config: {}", path.display()));
        }
        if self.is_empty() {
            return Ok(default.clone());
        }

        let mut config = PipelineConfig::new().with_dedupe(self.dedupe);
        if let Some(expr) = &self.filter {
            let (column, op, value) = parse_filter(expr)?;
            config = config.with_filter_op(column, op, value);
        }
        for key in &self.sort {
            config = match key.strip_prefix('-') {
                Some(column) => config.with_sort(column, true),
                None => config.with_sort(key.as_str(), false),
            };
        }
        if let (Some(column), Some(agg)) = (&self.group, &self.agg) {
            config = config.with_group(column.as_str(), agg.as_str());
        }
        if self.dropna {
            config = config.with_nulls(NullHandling::Drop);
        } else if let Some(fill) = &self.fill {
            let value = (!fill.is_empty()).then(|| fill.clone());
            config = config.with_nulls(NullHandling::Fill { value });
        }
        Ok(config)
    }
}

/// Split `column<op>value`, trying two-character operators first.
fn parse_filter(expr: &str) -> Result<(String, FilterOp, String)> {
    const OPERATORS: [&str; 8] = ["==", "!=", "<=", ">=", "=", "<", ">", "~"];
    OPERATORS
        .iter()
        .filter_map(|sym| {
            let (column, value) = expr.split_once(sym)?;
            let op = sym.parse::<FilterOp>().ok()?;
            Some((column.len(), column, op, value))
        })
        .min_by_key(|(pos, ..)| *pos)
        .map(|(_, column, op, value)| (column.trim().to_owned(), op, value.trim().to_owned()))
        .with_context(|| format!("Invalid filter '{expr}', expected e.g. name=alice or age>30"))
}

pub fn run_command(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Info { file } => {
            let session = open(&file, settings)?;
            print!("{}", session.info(Scope::Table));
        }
        Commands::Head { file, rows } => {
            let session = open(&file, settings)?;
            let n = rows.unwrap_or(settings.head_rows);
            let view = session.view();
            println!("{}", render(view.columns(), view.head(n), 0));
        }
        Commands::Describe { file, stages } => {
            let session = open_with(&file, settings, &stages)?;
            match session.describe(Scope::View) {
                Ok(table) => println!("{}", render_table(&table)),
                // Shown as an empty result, not a failure
                Err(EngineError::NoNumericColumns) => println!("No numeric columns to describe."),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Nulls { file, stages } => {
            let session = open_with(&file, settings, &stages)?;
            let counts = session.null_counts(Scope::View);
            let width = counts.iter().map(|(c, _)| c.chars().count()).max().unwrap_or(0);
            for (column, count) in counts {
                println!("{column:<width$}  {count}");
            }
        }
        Commands::View {
            file,
            stages,
            page,
            page_size,
            output,
            save_pipeline,
        } => {
            let session = open_with(&file, settings, &stages)?;
            if let Some(path) = save_pipeline {
                session.config().to_file(&path)?;
                println!("Pipeline saved to {}", path.display());
            }
            if let Some(path) = output {
                session.save_view(&path)?;
                println!("Wrote {} rows to {}", session.view().row_count(), path.display());
            } else {
                let size = page_size.unwrap_or(settings.page_size);
                print_page(&session.view().page(page, size)?, session.view());
            }
        }
        Commands::Edit {
            file,
            row,
            column,
            value,
            output,
        } => {
            let mut session = open(&file, settings)?;
            let outcome = session.edit(EditRequest::new(row, column, value))?;
            let target = output.unwrap_or(file);
            session.save_table(&target)?;
            println!(
                "Row {} column '{}': {} -> {} (saved to {})",
                outcome.row,
                outcome.column,
                outcome.previous,
                outcome.value,
                target.display()
            );
        }
        Commands::Plot {
            file,
            stages,
            kind,
            x,
            y,
        } => {
            let session = open_with(&file, settings, &stages)?;
            let data = session.plot(&PlotRequest { kind, x, y })?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Config { init } => {
            let path = config::config_path()?;
            if init {
                settings.save()?;
                println!("Settings written to {}", path.display());
            } else {
                println!("Settings file: {}", path.display());
            }
            println!("Log file: {}", logging::get_current_log_path()?.display());
            println!("{}", serde_json::to_string_pretty(settings)?);
        }
    }
    Ok(())
}

/// Where to look after a failure that bad input does not explain.
pub fn failure_hint(err: &anyhow::Error, settings: &Settings) -> Option<String> {
    let user_error = err
        .chain()
        .find_map(|e| e.downcast_ref::<EngineError>())
        .is_some_and(EngineError::is_user_error);
    if user_error || !settings.log_to_file {
        return None;
    }
    let path = logging::get_current_log_path().ok()?;
    Some(format!("See {} for details", path.display()))
}

fn open(file: &Path, settings: &Settings) -> Result<Session> {
    let mut session = Session::with_na_values(settings.na());
    session
        .load_path(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    Ok(session)
}

fn open_with(file: &Path, settings: &Settings, stages: &StageArgs) -> Result<Session> {
    let mut session = open(file, settings)?;
    let config = stages.to_config(&settings.default_pipeline)?;

    let problems = session.check(&config);
    if !problems.is_empty() {
        let list: Vec<String> = problems.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid pipeline:\n  {}", list.join("\n  "));
    }
    session.apply(config)?;
    Ok(session)
}

fn print_page(page: &Page<'_>, view: &View) {
    println!("{}", render(view.columns(), page.rows, page.first_row));
    println!(
        "Page {}/{} ({} rows{})",
        page.index + 1,
        page.total_pages,
        page.total_rows,
        if view.is_grouped() { ", grouped" } else { "" }
    );
}

fn render_table(table: &Table) -> String {
    let rows: Vec<ViewRow> = table
        .rows()
        .map(|values| ViewRow {
            origin: None,
            values: values.to_vec(),
        })
        .collect();
    render(table.columns(), &rows, 0)
}

/// Plain-text grid with the view position in the first column.
fn render(columns: &[Column], rows: &[ViewRow], first_row: usize) -> String {
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    let mut header = vec![String::new()];
    header.extend(columns.iter().map(|c| c.name.clone()));
    cells.push(header);
    for (i, row) in rows.iter().enumerate() {
        let mut line = vec![(first_row + i).to_string()];
        line.extend(row.values.iter().map(ToString::to_string));
        cells.push(line);
    }

    let mut widths = vec![0_usize; columns.len() + 1];
    for line in &cells {
        for (w, cell) in widths.iter_mut().zip(line) {
            *w = (*w).max(cell.chars().count());
        }
    }

    cells
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell:>w$}"))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
