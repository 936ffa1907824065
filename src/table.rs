//! Resampled tables
//!
//! Samples every non-moment behavior of an observation set on a uniform grid
//! and lays the results out as named columns.
//!
//! The grid covers bins `floor(start*rate + tol) ..= floor(end*rate + tol) - 1`.
//! Bin `b` is reported at time `b / rate` but sampled at `(b + offset) / rate`,
//! where the offset is `tol` for [`BinSide::Left`] and `1 - tol` for
//! [`BinSide::Right`]. Sampling near the right edge attributes an event coded
//! on a video frame to the bin that frame falls in.

use crate::error::{Result, TinbergenError};
use crate::resample::resample;
use crate::types::{
    BehaviorKind, BehaviorRecord, Column, ObservationSet, ResampledTable, StackedTable, TableSet,
    Value,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default tolerance, as a fraction of a bin
pub const DEFAULT_BIN_TOL: f64 = 0.01;

/// Prefix for field identifiers that would otherwise start with a digit or `_`
pub const FIELD_PREFIX: char = 'x';

/// Largest number of bins in one grid
pub const MAX_GRID_BINS: usize = 1 << 28;

/// Bin numbers beyond this are not exact in `f64`
const MAX_EXACT_BIN: f64 = (1u64 << 53) as f64;

/// Name of the synthetic grid column
pub const TIME_COLUMN: &str = "time";

/// Which edge of each bin is sampled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinSide {
    Left,
    #[default]
    Right,
}

/// Table building options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Edge of each bin to sample (default: right)
    pub bin_side: BinSide,
    /// Distance from the sampled edge, as a fraction of a bin (default: 0.01)
    pub bin_tol: f64,
    /// Values assumed before the first observation, keyed by behavior name
    pub initial_values: BTreeMap<String, Value>,
    /// Value assumed for binary behaviors without an explicit initial value;
    /// `None` leaves them without one (default: `Some(false)`)
    pub initial_binary: Option<bool>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bin_side: BinSide::Right,
            bin_tol: DEFAULT_BIN_TOL,
            initial_values: BTreeMap::new(),
            initial_binary: Some(false),
        }
    }
}

impl TableConfig {
    /// Load a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_initial_value(mut self, behavior: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_values.insert(behavior.into(), value.into());
        self
    }

    fn initial_value(&self, record: &BehaviorRecord) -> Option<Value> {
        if let Some(value) = self.initial_values.get(&record.name) {
            return Some(value.clone());
        }
        match record.kind {
            Some(BehaviorKind::Binary) => self.initial_binary.map(Value::Bool),
            _ => None,
        }
    }
}

/// A uniform sampling grid
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    /// Integer bin numbers
    pub bins: Vec<i64>,
    /// Reported time of each bin (`bin / rate`)
    pub times: Vec<f64>,
    /// Time at which each bin is sampled
    pub queries: Vec<f64>,
}

impl SampleGrid {
    pub fn new(start: f64, end: f64, rate: f64, side: BinSide, tol: f64) -> Result<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(TinbergenError::InvalidRate(rate));
        }
        for (name, bound) in [("start", start), ("end", end), ("bin tolerance", tol)] {
            if !bound.is_finite() {
                return Err(TinbergenError::InvalidGrid(format!("{name} is {bound}")));
            }
        }

        let first = (start * rate + tol).floor();
        let last = (end * rate + tol).floor() - 1.0;
        let offset = match side {
            BinSide::Left => tol,
            BinSide::Right => 1.0 - tol,
        };

        if last < first {
            return Ok(Self {
                bins: Vec::new(),
                times: Vec::new(),
                queries: Vec::new(),
            });
        }
        if first < -MAX_EXACT_BIN || last > MAX_EXACT_BIN {
            return Err(TinbergenError::InvalidGrid(format!(
                "[{start}, {end}) at rate {rate} is out of range"
            )));
        }
        if last - first + 1.0 > MAX_GRID_BINS as f64 {
            return Err(TinbergenError::InvalidGrid(format!(
                "[{start}, {end}) at rate {rate} exceeds {MAX_GRID_BINS} bins"
            )));
        }

        let bins: Vec<i64> = (first as i64..=last as i64).collect();
        let times = bins.iter().map(|&b| b as f64 / rate).collect();
        let queries = bins.iter().map(|&b| (b as f64 + offset) / rate).collect();
        Ok(Self {
            bins,
            times,
            queries,
        })
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Turn a behavior name into an identifier made of `[A-Za-z0-9_]` that does
/// not start with a digit or underscore.
pub fn sanitize_field_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match cleaned.chars().next() {
        None => FIELD_PREFIX.to_string(),
        Some(c) if c.is_ascii_digit() || c == '_' => format!("{FIELD_PREFIX}{cleaned}"),
        Some(_) => cleaned,
    }
}

fn unique_field_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_field_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Resample one observation set onto the grid `[start, end)` at `rate`.
///
/// Moment behaviors are skipped. A `time` column holding the grid comes
/// first unless a behavior is itself named `time`, in which case that
/// behavior's column is the only `time` column.
pub fn build_table(
    set: &ObservationSet,
    start: f64,
    end: f64,
    rate: f64,
    config: &TableConfig,
) -> Result<ResampledTable> {
    let grid = SampleGrid::new(start, end, rate, config.bin_side, config.bin_tol)?;

    let mut taken = HashSet::new();
    let mut field_names = BTreeMap::new();
    let mut behavior_columns = Vec::new();

    for record in &set.behavior_records {
        if record.kind == Some(BehaviorKind::Moment) {
            continue;
        }

        let init = config.initial_value(record);
        let sampled = resample(&record.time, &record.value, &grid.queries, init.as_ref())
            .map_err(|e| match e {
                TinbergenError::MissingInitialValue => TinbergenError::MissingInitialValueFor {
                    behavior: record.name.clone(),
                    source_file: set.source.clone(),
                    observer: set.observer.clone(),
                    start,
                },
                other => other,
            })?;

        let field = unique_field_name(&record.name, &mut taken);
        field_names.insert(field.clone(), record.name.clone());
        behavior_columns.push(Column {
            name: field,
            values: sampled.values,
        });
    }

    let mut columns = Vec::with_capacity(behavior_columns.len() + 1);
    if !taken.contains(TIME_COLUMN) {
        columns.push(Column {
            name: TIME_COLUMN.to_string(),
            values: grid.times.iter().map(|&t| Value::Number(t)).collect(),
        });
    }
    columns.extend(behavior_columns);

    log::debug!(
        "Built table for '{}' ({}): {} rows x {} columns",
        set.source,
        set.observer,
        grid.len(),
        columns.len()
    );

    Ok(ResampledTable {
        source: set.source.clone(),
        observer: set.observer.clone(),
        columns,
        field_names,
    })
}

/// Build one table per observation set and stack them if every table has
/// the same columns; otherwise return them separately.
pub fn build_tables(
    sets: &[ObservationSet],
    start: f64,
    end: f64,
    rate: f64,
    config: &TableConfig,
) -> Result<TableSet> {
    let tables = sets
        .iter()
        .map(|set| build_table(set, start, end, rate, config))
        .collect::<Result<Vec<_>>>()?;
    Ok(stack_tables(tables))
}

/// Stack tables row-wise when their schemas agree.
pub fn stack_tables(tables: Vec<ResampledTable>) -> TableSet {
    let Some(first) = tables.first() else {
        return TableSet::Separate { tables };
    };

    let same_schema = tables
        .iter()
        .all(|t| t.schema() == first.schema() && t.field_names == first.field_names);
    if !same_schema {
        log::info!(
            "Tables have differing columns; returning {} separate tables",
            tables.len()
        );
        return TableSet::Separate { tables };
    }

    let field_names = first.field_names.clone();
    let mut columns: Vec<Column> = first
        .columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            values: Vec::new(),
        })
        .collect();
    let mut source = Vec::new();
    let mut observer = Vec::new();

    for table in tables {
        let rows = table.len();
        source.extend(std::iter::repeat(table.source).take(rows));
        observer.extend(std::iter::repeat(table.observer).take(rows));
        for (target, column) in columns.iter_mut().zip(table.columns) {
            target.values.extend(column.values);
        }
    }

    TableSet::Stacked(StackedTable {
        source,
        observer,
        columns,
        field_names,
    })
}
