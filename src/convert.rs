//! Value conversion
//!
//! Observation files store every value as text. This module turns those raw
//! strings into typed [`Value`]s, either through a converter registered for a
//! behavior name or, for binary behaviors, by reading `"True"` as `true`.

use crate::error::{Result, TinbergenError};
use crate::types::{BehaviorKind, BehaviorRecord, ObservationSet, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A custom conversion from raw strings to typed values. Must return exactly
/// one value per input.
pub type ConverterFn = Arc<dyn Fn(&[String]) -> Vec<Value> + Send + Sync>;

/// Converter that parses each value as a number; unparsable text becomes NaN.
pub fn numeric() -> ConverterFn {
    Arc::new(|raw: &[String]| -> Vec<Value> {
        raw.iter()
            .map(|s| Value::Number(s.trim().parse().unwrap_or(f64::NAN)))
            .collect()
    })
}

/// Converter that reads `"True"` (any case) as true and anything else as false.
pub fn boolean() -> ConverterFn {
    Arc::new(|raw: &[String]| -> Vec<Value> {
        raw.iter().map(|s| Value::Bool(is_true(s))).collect()
    })
}

fn is_true(s: &str) -> bool {
    s.eq_ignore_ascii_case("True")
}

/// Per-behavior conversion settings
#[derive(Clone)]
pub struct ValueConverter {
    /// Converters keyed by behavior name
    pub converters: HashMap<String, ConverterFn>,
    /// Convert `binary` behaviors without a registered converter to booleans
    pub convert_binary: bool,
}

impl Default for ValueConverter {
    fn default() -> Self {
        Self {
            converters: HashMap::new(),
            convert_binary: true,
        }
    }
}

impl fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("ValueConverter")
            .field("converters", &names)
            .field("convert_binary", &self.convert_binary)
            .finish()
    }
}

impl ValueConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter for one behavior
    pub fn with_converter(mut self, behavior: impl Into<String>, converter: ConverterFn) -> Self {
        self.converters.insert(behavior.into(), converter);
        self
    }

    /// Enable or disable automatic conversion of binary behaviors
    pub fn with_binary_conversion(mut self, enabled: bool) -> Self {
        self.convert_binary = enabled;
        self
    }

    /// Convert the values of one record
    pub fn convert_record(&self, mut record: BehaviorRecord) -> Result<BehaviorRecord> {
        if let Some(converter) = self.converters.get(&record.name) {
            let raw: Vec<String> = record.value.iter().map(Value::to_string).collect();
            let converted = converter(raw.as_slice());
            if converted.len() != raw.len() {
                return Err(TinbergenError::ConversionError {
                    behavior: record.name,
                    expected: raw.len(),
                    actual: converted.len(),
                });
            }
            record.value = converted;
        } else if self.convert_binary && record.kind == Some(BehaviorKind::Binary) {
            record.value = record
                .value
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Value::Bool(*b),
                    other => Value::Bool(is_true(&other.to_string())),
                })
                .collect();
        }
        Ok(record)
    }

    /// Convert every record of one observation set
    pub fn convert_set(&self, mut set: ObservationSet) -> Result<ObservationSet> {
        set.behavior_records = set
            .behavior_records
            .into_iter()
            .map(|r| self.convert_record(r))
            .collect::<Result<_>>()?;
        Ok(set)
    }

    /// Convert a sequence of observation sets, each independently
    pub fn convert_all(&self, sets: Vec<ObservationSet>) -> Result<Vec<ObservationSet>> {
        sets.into_iter().map(|s| self.convert_set(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(name: &str, kind: BehaviorKind, values: &[&str]) -> BehaviorRecord {
        BehaviorRecord {
            name: name.to_string(),
            kind: Some(kind),
            time: (0..values.len()).map(|i| i as f64).collect(),
            value: values.iter().map(|v| Value::text(*v)).collect(),
        }
    }

    #[test]
    fn test_binary_auto_conversion() {
        let converter = ValueConverter::new();
        let out = converter
            .convert_record(record("Grooming", BehaviorKind::Binary, &["True", "false", "TRUE", "yes"]))
            .unwrap();

        assert_eq!(
            out.value,
            vec![
                Value::Bool(true),
                Value::Bool(false),
                Value::Bool(true),
                Value::Bool(false)
            ]
        );
    }

    #[test]
    fn test_binary_conversion_disabled() {
        let converter = ValueConverter::new().with_binary_conversion(false);
        let out = converter
            .convert_record(record("Grooming", BehaviorKind::Binary, &["True"]))
            .unwrap();
        assert_eq!(out.value, vec![Value::text("True")]);
    }

    #[test]
    fn test_custom_converter_wins_over_binary() {
        let converter = ValueConverter::new()
            .with_converter("Count", numeric())
            .with_converter("Grooming", Arc::new(|raw: &[String]| -> Vec<Value> {
                raw.iter().map(|s| Value::text(s.to_lowercase())).collect()
            }));

        let count = converter
            .convert_record(record("Count", BehaviorKind::Variable, &["1", "2.5", "many"]))
            .unwrap();
        assert_eq!(count.value[0], Value::Number(1.0));
        assert_eq!(count.value[1], Value::Number(2.5));
        assert!(count.value[2].as_f64().unwrap().is_nan());

        let grooming = converter
            .convert_record(record("Grooming", BehaviorKind::Binary, &["True"]))
            .unwrap();
        assert_eq!(grooming.value, vec![Value::text("true")]);
    }

    #[test]
    fn test_other_kinds_untouched() {
        let converter = ValueConverter::new();
        let out = converter
            .convert_record(record("Arousal", BehaviorKind::State, &["moving"]))
            .unwrap();
        assert_eq!(out.value, vec![Value::text("moving")]);
    }

    #[test]
    fn test_length_changing_converter_fails() {
        let converter = ValueConverter::new()
            .with_converter("Count", Arc::new(|_: &[String]| vec![Value::Number(0.0)]));

        let result = converter.convert_record(record("Count", BehaviorKind::Variable, &["1", "2"]));
        match result {
            Err(TinbergenError::ConversionError {
                behavior,
                expected,
                actual,
            }) => {
                assert_eq!(behavior, "Count");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected ConversionError, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_set_keeps_records_in_order() {
        let set = ObservationSet {
            observer: "AL".to_string(),
            source: "clip.mp4".to_string(),
            behavior_records: vec![
                record("Grooming", BehaviorKind::Binary, &["True"]),
                record("Arousal", BehaviorKind::State, &["moving"]),
            ],
        };
        let out = ValueConverter::new().convert_set(set).unwrap();

        assert_eq!(out.behavior_records[0].value, vec![Value::Bool(true)]);
        assert_eq!(out.behavior_records[1].name, "Arousal");
    }

    #[test]
    fn test_boolean_converter() {
        let convert = boolean();
        assert_eq!(
            convert(&["true".to_string(), "False".to_string()][..]),
            vec![Value::Bool(true), Value::Bool(false)]
        );
    }
}
