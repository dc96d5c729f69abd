//! # gridwork - tabular data engine
//!
//! gridwork owns one loaded dataset, derives read-only views from it through
//! a fixed-order transformation pipeline, summarises either, and writes
//! validated cell edits back to the canonical table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gridwork::pipeline::PipelineConfig;
//! use gridwork::session::{Scope, Session};
//! use std::path::Path;
//!
//! let mut session = Session::new();
//! session.load_path(Path::new("scores.csv"))?;
//!
//! // Filter, then sort descending by score
//! session.apply(
//!     PipelineConfig::new()
//!         .with_filter("team", "red")
//!         .with_sort("score", true),
//! )?;
//!
//! // Edit the top row of the view; lands on the right canonical row
//! session.edit_view_cell(0, "score", "42")?;
//!
//! println!("{}", session.info(Scope::View));
//! # Ok::<(), gridwork::error::EngineError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`table`]: values, column kinds, the canonical table and its store
//! - [`pipeline`]: filter, sort, group, null handling and dedupe stages
//! - [`summary`]: info, describe and null counts
//! - [`edit`]: validated cell edits and the edit journal
//! - [`session`]: one open document tying the above together
//! - [`plot`]: columnar data for chart consumers
//! - [`io`]: CSV/TSV/XLSX loaders and exporters
//! - [`error`]: the [`EngineError`](error::EngineError) type
//! - [`config`], [`logging`]: user settings and tracing setup
//!
//! ## Key Concepts
//!
//! ### Views are rebuilt, never mutated
//!
//! A [`View`](pipeline::View) is a pure function of the table and a
//! [`PipelineConfig`](pipeline::PipelineConfig). Editing a cell bumps the
//! store's revision; the pipeline then re-runs its last config.
//!
//! ### Stable row identity
//!
//! Each view row carries the canonical row it came from. Grouped rows are
//! synthetic and have none, so grouped views are read-only.
//!
//! ### Kinds are fixed at load
//!
//! Column kinds are inferred once. An edit that does not parse as the
//! column's kind is rejected rather than widening the column.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod edit;
pub mod error;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod plot;
pub mod session;
pub mod summary;
pub mod table;
