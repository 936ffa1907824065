//! Tinbergen Core - Parsing and resampling engine for behavioral observations
//!
//! Tinbergen turns hand-coded observation files into typed, time-aligned
//! tables through a deterministic pipeline: line reading → keyval parsing →
//! document loading → value conversion → step-function resampling.
//!
//! ## Modules
//!
//! - **Load path**: [`reader`], [`keyval`], [`loaders`], and [`aggregator`] read
//!   project, ethogram, and observation files into the data model in [`types`]
//! - **Analysis path**: [`convert`], [`resample`], and [`table`] turn observation
//!   sets into uniform-grid tables

pub mod aggregator;
pub mod convert;
pub mod error;
pub mod keyval;
pub mod loaders;
pub mod reader;
pub mod resample;
pub mod table;
pub mod types;

pub use aggregator::{load_project, ProjectData};
pub use convert::{ConverterFn, ValueConverter};
pub use error::{Result, TinbergenError};
pub use keyval::{parse_keyvals, to_keyval_string, KeyvalRecord};
pub use loaders::{DocumentLoader, EthogramLoader, ObservationLoader, ProjectLoader};
pub use resample::{resample, Resampled, StepFunction};
pub use table::{build_table, build_tables, BinSide, TableConfig};
pub use types::{
    Behavior, BehaviorKind, BehaviorRecord, Ethogram, ObservationSet, Project, ResampledTable,
    StackedTable, TableSet, Value,
};

/// Crate version, reported by the CLI
pub const TINBERGEN_VERSION: &str = env!("CARGO_PKG_VERSION");
