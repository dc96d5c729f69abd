//! Read-only summaries of a table or view.
//!
//! - [`schema_summary`] / [`info`]: per-column non-null counts and dtype labels
//! - [`describe`]: count, mean, std, min, quartiles and max of numeric columns
//! - [`null_counts`]: missing cells per column
//!
//! All functions take anything [`Tabular`](crate::table::Tabular), so they
//! work on the canonical table and on derived views alike.

pub mod describe;
pub mod info;

pub use describe::{STATISTICS, describe};
pub use info::{SchemaEntry, TableInfo, info, null_counts, schema_summary};
