//! Core types for the Tinbergen data model
//!
//! This module defines the records that flow through each stage: projects,
//! ethograms, observation sets, typed observation values, and resampled tables.

use crate::error::TinbergenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File suffix for observation files
pub const OBSERVATION_SUFFIX: &str = "tbobs";

/// File suffix for ethogram files
pub const ETHOGRAM_SUFFIX: &str = "tbethogram";

/// File suffix for project files
pub const PROJECT_SUFFIX: &str = "tbproject";

/// The only values a binary behavior may take
pub const BINARY_VALUES: [&str; 2] = ["True", "False"];

/// Kind of a coded behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    /// Instantaneous event taking negligible time
    Moment,
    /// On/off state
    Binary,
    /// One of an enumerated set of mutually exclusive values
    State,
    /// Arbitrary value tracked over time
    Variable,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::Moment => "moment",
            BehaviorKind::Binary => "binary",
            BehaviorKind::State => "state",
            BehaviorKind::Variable => "variable",
        }
    }

    /// Parse an optional kind literal; the empty string means "unknown".
    pub fn parse_optional(text: &str) -> Result<Option<Self>, TinbergenError> {
        if text.is_empty() {
            Ok(None)
        } else {
            text.parse().map(Some)
        }
    }
}

impl FromStr for BehaviorKind {
    type Err = TinbergenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moment" => Ok(BehaviorKind::Moment),
            "binary" => Ok(BehaviorKind::Binary),
            "state" => Ok(BehaviorKind::State),
            "variable" => Ok(BehaviorKind::Variable),
            other => Err(TinbergenError::InvalidKind(other.to_string())),
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed observation value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A project observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observer {
    pub name: String,
    pub code: String,
}

/// A Tinbergen project, as described by a `.tbproject` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Root directory holding observation files
    pub project_root: PathBuf,
    /// Root directory holding video files
    pub video_root: PathBuf,
    /// Path of the ethogram file
    pub ethogram_file: PathBuf,
    /// Declared observers, in file order
    pub observers: Vec<Observer>,
}

impl Project {
    /// Look up an observer's name by code
    pub fn observer_name(&self, code: &str) -> Option<&str> {
        self.observers
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.name.as_str())
    }

    /// Look up an observer's code by name
    pub fn observer_code(&self, name: &str) -> Option<&str> {
        self.observers
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.code.as_str())
    }

    /// True if `who` matches either an observer name or code
    pub fn has_observer(&self, who: &str) -> bool {
        self.observers.iter().any(|o| o.code == who || o.name == who)
    }

    /// Where observations of `video` by `observer_code` are stored:
    /// `<project_root>/<video>.<observer_code>.tbobs`
    pub fn observation_path(&self, video: impl AsRef<Path>, observer_code: &str) -> PathBuf {
        let mut file = self.project_root.join(video).into_os_string();
        file.push(".");
        file.push(observer_code);
        file.push(".");
        file.push(OBSERVATION_SUFFIX);
        PathBuf::from(file)
    }
}

/// A behavior definition from an ethogram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    pub name: String,
    pub kind: BehaviorKind,
    /// Allowed values; only populated for `state` behaviors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

/// A coding shorthand: typing `symbol a1 a2` records an observation of `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub symbol: String,
    pub name: String,
    /// Parameter names bound positionally to the arguments typed after the symbol
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Any other fields carried into the observation (e.g. `value=True`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Observation fields produced from a typed coding entry
pub type ObservationPrototype = BTreeMap<String, String>;

/// A catalog of behaviors and the codes that refer to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ethogram {
    pub name: String,
    pub behaviors: Vec<Behavior>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<Code>,
}

impl Ethogram {
    pub fn behavior(&self, name: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.name == name)
    }

    pub fn code(&self, symbol: &str) -> Option<&Code> {
        self.codes.iter().find(|c| c.symbol == symbol)
    }

    /// Behavior names in ethogram order
    pub fn behavior_names(&self) -> Vec<String> {
        self.behaviors.iter().map(|b| b.name.clone()).collect()
    }

    /// Behavior kinds in ethogram order
    pub fn behavior_kinds(&self) -> Vec<Option<BehaviorKind>> {
        self.behaviors.iter().map(|b| Some(b.kind)).collect()
    }

    /// Turn a typed entry of the form `symbol arg1 arg2 ...` into an
    /// observation prototype.
    ///
    /// Unknown symbols are not an error: the prototype then only carries the
    /// `entry` field. Use [`Ethogram::validate_obs`] to check the result.
    pub fn parse_entry(&self, entry: &str) -> ObservationPrototype {
        let mut proto = ObservationPrototype::new();
        proto.insert("entry".to_string(), entry.to_string());

        let mut words = entry.split_whitespace();
        let Some(symbol) = words.next() else {
            return proto;
        };
        let Some(code) = self.code(symbol) else {
            return proto;
        };

        // Positional args, then code extras, then behavior identity; later inserts win
        for (param, arg) in code.args.iter().zip(words) {
            proto.insert(param.clone(), arg.to_string());
        }
        for (key, value) in &code.extra {
            proto.insert(key.clone(), value.clone());
        }
        if let Some(behavior) = self.behavior(&code.name) {
            proto.insert("name".to_string(), behavior.name.clone());
            proto.insert("kind".to_string(), behavior.kind.to_string());
        }
        proto.insert("entry".to_string(), entry.to_string());
        proto
    }

    /// Check an observation against the ethogram.
    ///
    /// Returns the keys that conflict with the ethogram; an empty list means
    /// the observation is valid.
    pub fn validate_obs(&self, obs: &ObservationPrototype) -> Vec<&'static str> {
        let Some(behavior) = obs.get("name").and_then(|n| self.behavior(n)) else {
            return vec!["name"];
        };

        let mut conflicts = Vec::new();
        if obs.get("kind").map(String::as_str) != Some(behavior.kind.as_str()) {
            conflicts.push("kind");
        }
        let value = obs.get("value").map(String::as_str);
        let value_ok = match behavior.kind {
            BehaviorKind::State => {
                value.is_some_and(|v| behavior.allowed_values.iter().any(|a| a == v))
            }
            BehaviorKind::Binary => value.is_some_and(|v| BINARY_VALUES.contains(&v)),
            _ => true,
        };
        if !value_ok {
            conflicts.push("value");
        }
        conflicts
    }
}

/// All observations of one behavior within an observation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub name: String,
    /// `None` when neither the caller nor the file supplied a kind
    pub kind: Option<BehaviorKind>,
    /// Observation times, ascending
    pub time: Vec<f64>,
    /// Values, parallel to `time`
    pub value: Vec<Value>,
}

impl BehaviorRecord {
    pub fn empty(name: impl Into<String>, kind: Option<BehaviorKind>) -> Self {
        Self {
            name: name.into(),
            kind,
            time: Vec::new(),
            value: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// All timestamped observations coded for one video by one observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    pub observer: String,
    pub source: String,
    pub behavior_records: Vec<BehaviorRecord>,
}

impl ObservationSet {
    pub fn record(&self, name: &str) -> Option<&BehaviorRecord> {
        self.behavior_records.iter().find(|r| r.name == name)
    }

    /// Total number of observations across all behaviors
    pub fn observation_count(&self) -> usize {
        self.behavior_records.iter().map(BehaviorRecord::len).sum()
    }
}

/// A named table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Behavior values resampled onto a uniform time grid for one observation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledTable {
    pub source: String,
    pub observer: String,
    /// Columns in output order; the synthetic `time` grid column comes first
    pub columns: Vec<Column>,
    /// Sanitized field identifier -> original behavior name
    pub field_names: BTreeMap<String, String>,
}

impl ResampledTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Ordered column names
    pub fn schema(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `time` column as numbers, if present and numeric
    pub fn time(&self) -> Option<Vec<f64>> {
        self.column("time")?.values.iter().map(Value::as_f64).collect()
    }
}

/// Several tables with an identical schema, stacked row-wise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackedTable {
    /// Source of each row
    pub source: Vec<String>,
    /// Observer of each row
    pub observer: Vec<String>,
    pub columns: Vec<Column>,
    pub field_names: BTreeMap<String, String>,
}

impl StackedTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Result of building tables for several observation sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum TableSet {
    /// All tables shared one schema and were stacked
    Stacked(StackedTable),
    /// Schemas differed (or there was nothing to stack)
    Separate { tables: Vec<ResampledTable> },
}
