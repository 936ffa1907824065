//! Step-function resampling
//!
//! An observed behavior is a right-continuous step function: value `y[i]`
//! holds on `[t[i], t[i+1])` and the last value holds forever. Queries before
//! the first breakpoint resolve to an optional initial value.

use crate::error::{Result, TinbergenError};

/// Values at the query times, plus which breakpoint produced each one
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled<T> {
    pub values: Vec<T>,
    /// 1-based index into the sorted breakpoints; `0` means the initial value
    pub indices: Vec<usize>,
}

/// A step function with breakpoints sorted ascending
#[derive(Debug, Clone, PartialEq)]
pub struct StepFunction<T> {
    times: Vec<f64>,
    values: Vec<T>,
}

impl<T: Clone> StepFunction<T> {
    /// Build from parallel times and values. Unsorted input is sorted
    /// stably, so among equal times the last one listed wins.
    pub fn new(times: &[f64], values: &[T]) -> Result<Self> {
        if times.len() != values.len() {
            return Err(TinbergenError::ShapeError(format!(
                "{} times but {} values",
                times.len(),
                values.len()
            )));
        }

        if times.windows(2).all(|w| w[0] <= w[1]) {
            return Ok(Self {
                times: times.to_vec(),
                values: values.to_vec(),
            });
        }

        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
        Ok(Self {
            times: order.iter().map(|&i| times[i]).collect(),
            values: order.iter().map(|&i| values[i].clone()).collect(),
        })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Index of the greatest breakpoint `<= time`, 1-based; 0 if none
    pub fn locate(&self, time: f64) -> usize {
        self.times.partition_point(|&t| t <= time)
    }

    /// Evaluate at each query time, preserving query order.
    pub fn sample(&self, queries: &[f64], init: Option<&T>) -> Result<Resampled<T>> {
        let mut values = Vec::with_capacity(queries.len());
        let mut indices = Vec::with_capacity(queries.len());

        for &q in queries {
            let idx = self.locate(q);
            let value = if idx == 0 {
                init.ok_or(TinbergenError::MissingInitialValue)?.clone()
            } else {
                self.values[idx - 1].clone()
            };
            values.push(value);
            indices.push(idx);
        }

        Ok(Resampled { values, indices })
    }
}

/// Evaluate the step function `(t, y)` at the query times `tr`.
///
/// Fails with `MissingInitialValue` if any query precedes the first
/// breakpoint (or there are no breakpoints) and `init` is `None`.
pub fn resample<T: Clone>(t: &[f64], y: &[T], tr: &[f64], init: Option<&T>) -> Result<Resampled<T>> {
    if tr.is_empty() {
        return Ok(Resampled {
            values: Vec::new(),
            indices: Vec::new(),
        });
    }
    StepFunction::new(t, y)?.sample(tr, init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_breakpoints_return_original_values() {
        let t = [0.0, 1.4, 2.2, 5.0];
        let y = ["a", "b", "c", "d"];
        let out = resample(&t, &y, &t, None).unwrap();

        assert_eq!(out.values, y.to_vec());
        assert_eq!(out.indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_between_and_after_breakpoints() {
        let out = resample(&[0.0, 1.0], &[10, 20], &[0.5, 0.999, 1.0, 100.0], None).unwrap();
        assert_eq!(out.values, vec![10, 10, 20, 20]);
    }

    #[test]
    fn test_query_before_first_needs_init() {
        let t = [1.0, 2.0];
        let y = [1, 2];

        let err = resample(&t, &y, &[0.5, 1.5], None);
        assert!(matches!(err, Err(TinbergenError::MissingInitialValue)));

        let out = resample(&t, &y, &[0.0, 0.5, 1.5], Some(&0)).unwrap();
        assert_eq!(out.values, vec![0, 0, 1]);
        assert_eq!(out.indices, vec![0, 0, 1]);
    }

    #[test]
    fn test_empty_breakpoints() {
        let t: [f64; 0] = [];
        let y: [bool; 0] = [];

        assert!(matches!(
            resample(&t, &y, &[0.0], None),
            Err(TinbergenError::MissingInitialValue)
        ));
        let out = resample(&t, &y, &[0.0, 3.0], Some(&false)).unwrap();
        assert_eq!(out.values, vec![false, false]);
        assert_eq!(out.indices, vec![0, 0]);
    }

    #[test]
    fn test_empty_queries() {
        let out = resample(&[1.0], &["x"], &[], None).unwrap();
        assert!(out.values.is_empty());
        // No queries means nothing needs an initial value
        let out = resample::<u8>(&[], &[], &[], None).unwrap();
        assert!(out.indices.is_empty());
    }

    #[test]
    fn test_unsorted_breakpoints_and_query_order() {
        let t = [2.0, 0.0, 1.0];
        let y = ['c', 'a', 'b'];
        let out = resample(&t, &y, &[2.5, 0.1, 1.2], None).unwrap();

        assert_eq!(out.values, vec!['c', 'a', 'b']);
        assert_eq!(out.indices, vec![3, 1, 2]);
    }

    #[test]
    fn test_equal_times_last_wins() {
        let f = StepFunction::new(&[1.0, 1.0], &["first", "second"]).unwrap();
        assert_eq!(f.sample(&[1.0], None).unwrap().values, vec!["second"]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            StepFunction::new(&[1.0], &[1, 2]),
            Err(TinbergenError::ShapeError(_))
        ));
    }
}
