//! # gridwork command-line entry point
//!
//! ```text
//! main()
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load user settings (config.json, defaults when absent)
//!   ├─> Initialise logging (console + rolling files)
//!   └─> Run the command against a fresh session
//! ```
//!
//! ```bash
//! gridwork info data.csv
//! gridwork view data.csv --filter "name=a" --sort -score --page 1
//! gridwork edit data.xlsx --row 3 --column score --value 4.5 -o edited.xlsx
//! gridwork config --init
//! ```

#![expect(clippy::print_stdout, clippy::print_stderr)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;
use gridwork::config::Settings;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let settings = Settings::load();
    gridwork::logging::init(settings.log_to_file)?;

    let result = cli::run_command(cli.command, &settings);
    if let Err(err) = &result {
        tracing::error!("{err:#}");
        if let Some(hint) = cli::failure_hint(err, &settings) {
            eprintln!("{hint}");
        }
    }
    result
}
