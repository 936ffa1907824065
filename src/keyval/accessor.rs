//! Key accessor
//!
//! Retrieves one key from a batch of keyval records. The caller picks the
//! shape of both levels explicitly:
//!
//! - [`ValueMode`] decides whether each record's item list is returned as a
//!   scalar or a list.
//! - [`ResultMode`] decides whether the per-record results come back as a
//!   single value or a list with one entry per record.

use super::parser::KeyvalRecord;
use crate::error::{Result, TinbergenError};
use serde::{Deserialize, Serialize};

/// Shape of each retrieved value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueMode {
    /// Scalar if the item list has exactly one entry, list otherwise
    #[default]
    Auto,
    ForceList,
    /// Fails with `ShapeError` unless the item list has exactly one entry
    ForceScalar,
}

/// Shape of the overall result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultMode {
    /// Scalar if exactly one record was given, list otherwise
    #[default]
    Auto,
    ForceList,
    /// Fails with `ShapeError` unless exactly one record was given
    ForceScalar,
}

/// A value that is either a single item or a list of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Shaped<T> {
    Scalar(T),
    List(Vec<T>),
}

impl<T> Shaped<T> {
    pub fn as_scalar(&self) -> Option<&T> {
        match self {
            Shaped::Scalar(v) => Some(v),
            Shaped::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[T]> {
        match self {
            Shaped::Scalar(_) => None,
            Shaped::List(v) => Some(v),
        }
    }

    /// Flatten to a list; a scalar becomes a one-element list
    pub fn into_list(self) -> Vec<T> {
        match self {
            Shaped::Scalar(v) => vec![v],
            Shaped::List(v) => v,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Shaped<U> {
        match self {
            Shaped::Scalar(v) => Shaped::Scalar(f(v)),
            Shaped::List(v) => Shaped::List(v.into_iter().map(f).collect()),
        }
    }
}

/// Retrieve `key` from every record, shaped per the two modes.
///
/// A record without `key` yields an empty list (list-valued modes) or an
/// empty string (`ValueMode::ForceScalar`).
pub fn get_key(
    records: &[KeyvalRecord],
    key: &str,
    value_mode: ValueMode,
    result_mode: ResultMode,
) -> Result<Shaped<Shaped<String>>> {
    let mut values = records
        .iter()
        .map(|record| shape_value(record.get(key), key, value_mode))
        .collect::<Result<Vec<_>>>()?;

    match (result_mode, values.len()) {
        (ResultMode::ForceList, _) => Ok(Shaped::List(values)),
        (_, 1) => Ok(Shaped::Scalar(values.swap_remove(0))),
        (ResultMode::Auto, _) => Ok(Shaped::List(values)),
        (ResultMode::ForceScalar, n) => Err(TinbergenError::ShapeError(format!(
            "expected exactly one record when reading '{}', got {}",
            key, n
        ))),
    }
}

fn shape_value(items: Option<&[String]>, key: &str, mode: ValueMode) -> Result<Shaped<String>> {
    match (mode, items) {
        (ValueMode::ForceScalar, None) => Ok(Shaped::Scalar(String::new())),
        (ValueMode::ForceScalar, Some([only])) => Ok(Shaped::Scalar(only.clone())),
        (ValueMode::ForceScalar, Some(items)) => Err(TinbergenError::ShapeError(format!(
            "expected a single item for '{}', got {}",
            key,
            items.len()
        ))),
        (ValueMode::Auto, Some([only])) => Ok(Shaped::Scalar(only.clone())),
        (_, items) => Ok(Shaped::List(items.map(<[String]>::to_vec).unwrap_or_default())),
    }
}

/// One scalar per record; fails if any record holds a list for `key`.
pub fn scalars(records: &[KeyvalRecord], key: &str) -> Result<Vec<String>> {
    let shaped = get_key(records, key, ValueMode::ForceScalar, ResultMode::ForceList)?;
    Ok(shaped
        .into_list()
        .into_iter()
        .flat_map(Shaped::into_list)
        .collect())
}

/// One item list per record.
pub fn lists(records: &[KeyvalRecord], key: &str) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| r.get(key).map(<[String]>::to_vec).unwrap_or_default())
        .collect()
}

/// One scalar per record, where an explicitly empty value (`key=`) also reads
/// as the empty string.
pub fn optional_scalars(records: &[KeyvalRecord], key: &str) -> Result<Vec<String>> {
    records
        .iter()
        .map(|record| match record.get(key) {
            None | Some([]) => Ok(String::new()),
            Some([only]) => Ok(only.clone()),
            Some(items) => Err(TinbergenError::ShapeError(format!(
                "expected a single item for '{}', got {}",
                key,
                items.len()
            ))),
        })
        .collect()
}

/// Scalar `key` of a single record.
pub fn scalar_of(record: &KeyvalRecord, key: &str) -> Result<String> {
    match shape_value(record.get(key), key, ValueMode::ForceScalar)? {
        Shaped::Scalar(v) => Ok(v),
        Shaped::List(_) => Ok(String::new()),
    }
}

/// Item list `key` of a single record.
pub fn list_of(record: &KeyvalRecord, key: &str) -> Vec<String> {
    record.get(key).map(<[String]>::to_vec).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyval::parse_many;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Shaped<String> {
        Shaped::Scalar(v.to_string())
    }

    fn l(v: &[&str]) -> Shaped<String> {
        Shaped::List(v.iter().map(|x| x.to_string()).collect())
    }

    #[test]
    fn test_auto_modes_single_record() {
        let records = parse_many(["name=Count values=a,b"]);

        let name = get_key(&records, "name", ValueMode::Auto, ResultMode::Auto).unwrap();
        assert_eq!(name, Shaped::Scalar(s("Count")));

        let values = get_key(&records, "values", ValueMode::Auto, ResultMode::Auto).unwrap();
        assert_eq!(values, Shaped::Scalar(l(&["a", "b"])));
    }

    #[test]
    fn test_auto_modes_many_records() {
        let records = parse_many(["name=a", "name=b,c", "other=1"]);

        let result = get_key(&records, "name", ValueMode::Auto, ResultMode::Auto).unwrap();
        assert_eq!(
            result,
            Shaped::List(vec![s("a"), l(&["b", "c"]), l(&[])])
        );
    }

    #[test]
    fn test_force_list_value() {
        let records = parse_many(["name=a"]);
        let result = get_key(&records, "name", ValueMode::ForceList, ResultMode::ForceList).unwrap();
        assert_eq!(result, Shaped::List(vec![l(&["a"])]));
    }

    #[test]
    fn test_force_scalar_value_defaults_and_errors() {
        let records = parse_many(["kind=state", "name=x"]);
        let result =
            get_key(&records, "kind", ValueMode::ForceScalar, ResultMode::ForceList).unwrap();
        assert_eq!(result, Shaped::List(vec![s("state"), s("")]));

        let records = parse_many(["values=a,b"]);
        let err = get_key(&records, "values", ValueMode::ForceScalar, ResultMode::Auto);
        assert!(matches!(err, Err(TinbergenError::ShapeError(_))));
    }

    #[test]
    fn test_force_scalar_result_requires_one_record() {
        let records = parse_many(["a=1", "a=2"]);
        let err = get_key(&records, "a", ValueMode::Auto, ResultMode::ForceScalar);
        assert!(matches!(err, Err(TinbergenError::ShapeError(_))));

        let none: Vec<KeyvalRecord> = Vec::new();
        let err = get_key(&none, "a", ValueMode::Auto, ResultMode::ForceScalar);
        assert!(matches!(err, Err(TinbergenError::ShapeError(_))));

        let auto = get_key(&none, "a", ValueMode::Auto, ResultMode::Auto).unwrap();
        assert_eq!(auto, Shaped::List(vec![]));
    }

    #[test]
    fn test_helpers() {
        let records = parse_many(["name=a time=1 value=", "name=b time=2 value=x"]);

        assert_eq!(scalars(&records, "name").unwrap(), vec!["a", "b"]);
        assert_eq!(optional_scalars(&records, "value").unwrap(), vec!["", "x"]);
        assert!(scalars(&records, "value").is_err());
        assert_eq!(lists(&records, "value"), vec![vec![], vec!["x".to_string()]]);
        assert_eq!(scalar_of(&records[0], "missing").unwrap(), "");
        assert!(list_of(&records[0], "missing").is_empty());
    }
}
