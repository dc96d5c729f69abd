//! View pipeline: derives read-only views from the canonical table.
//!
//! A [`PipelineConfig`] describes up to five stages which always run in the
//! same order:
//!
//! 1. **Filter**: keep rows where one column compares to a value
//! 2. **Sort**: stable multi-key sort, missing values last
//! 3. **Group**: partition by a key column and aggregate the rest
//! 4. **Nulls**: drop rows with missing cells, or fill them
//! 5. **Dedupe**: drop fully repeated rows, keeping the first
//!
//! # Example
//!
//! ```
//! use gridwork::pipeline::{PipelineConfig, ViewPipeline};
//! use gridwork::table::{RawTable, TableStore};
//!
//! let mut store = TableStore::new();
//! store.load(RawTable::new(
//!     vec!["name".into(), "score".into()],
//!     vec![vec!["a".into(), "1".into()], vec!["b".into(), "2".into()]],
//! ))?;
//!
//! let mut pipeline = ViewPipeline::new();
//! let view = pipeline.execute(&store, PipelineConfig::new().with_filter("name", "b"))?;
//! assert_eq!(view.origin(0)?, 1);
//! # Ok::<(), gridwork::error::EngineError>(())
//! ```

pub mod aggregate;
pub mod executor;
pub mod spec;
pub mod validation;
pub mod view;

pub use aggregate::Aggregation;
pub use executor::{ViewPipeline, ViewReport, build_view};
pub use spec::{
    CONFIG_VERSION, FilterOp, FilterSpec, GroupSpec, NullHandling, PipelineConfig, SortKey,
    SortSpec,
};
pub use validation::{Stage, ValidationError, validate_config};
pub use view::{Page, View, ViewRow};
