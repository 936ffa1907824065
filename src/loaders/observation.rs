//! Observation file loader
//!
//! ```text
//! observer: AL
//! source: site1/clip.mp4
//! obs: name=Arousal kind=state time=1.4 value=moving
//! obs: name=Peck kind=moment time=0.2
//! ```
//!
//! Observations are sorted by time and grouped into one [`BehaviorRecord`]
//! per behavior.

use super::DocumentLoader;
use crate::error::{Result, TinbergenError};
use crate::keyval::{accessor, parse_many};
use crate::reader::Document;
use crate::types::{BehaviorKind, BehaviorRecord, Ethogram, ObservationSet, Value};
use std::path::Path;

/// A single `obs` line after parsing
struct RawObservation {
    name: String,
    time: f64,
    value: String,
    kind: Option<BehaviorKind>,
}

/// Loader for `.tbobs` files
///
/// With a behavior list, the loaded set has exactly one record per listed
/// behavior, in list order. Without one, behaviors are taken from the file.
#[derive(Debug, Clone, Default)]
pub struct ObservationLoader {
    behaviors: Option<Vec<String>>,
    kinds: Option<Vec<Option<BehaviorKind>>>,
}

impl ObservationLoader {
    /// Loader that infers behaviors from each file
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader producing one record per name in `behaviors`. `kinds`, if
    /// given, must be parallel to `behaviors`; a `None` kind is filled in from
    /// the first observation of that behavior.
    pub fn with_behaviors(
        behaviors: Vec<String>,
        kinds: Option<Vec<Option<BehaviorKind>>>,
    ) -> Self {
        Self {
            behaviors: Some(behaviors),
            kinds,
        }
    }

    /// Loader using the behavior list and kinds of an ethogram
    pub fn for_ethogram(ethogram: &Ethogram) -> Self {
        Self::with_behaviors(ethogram.behavior_names(), Some(ethogram.behavior_kinds()))
    }
}

impl DocumentLoader for ObservationLoader {
    type Output = ObservationSet;

    fn parse(&self, doc: &Document, _origin: Option<&Path>) -> Result<ObservationSet> {
        let observer = doc.require("observer")?.to_string();
        let source = doc
            .scalar("source")
            .or_else(|| doc.scalar("obs_source"))
            .ok_or_else(|| TinbergenError::MissingEntry("source".to_string()))?
            .to_string();

        let observations = parse_observations(doc)?;

        let behavior_records = match &self.behaviors {
            Some(names) => self.records_for(names, &observations)?,
            None => infer_records(&observations),
        };

        Ok(ObservationSet {
            observer,
            source,
            behavior_records,
        })
    }
}

impl ObservationLoader {
    fn records_for(
        &self,
        names: &[String],
        observations: &[RawObservation],
    ) -> Result<Vec<BehaviorRecord>> {
        if let Some(kinds) = &self.kinds {
            if kinds.len() != names.len() {
                return Err(TinbergenError::ShapeError(format!(
                    "{} behavior names but {} kinds",
                    names.len(),
                    kinds.len()
                )));
            }
        }

        let records = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let supplied = self.kinds.as_ref().and_then(|k| k[i]);
                let mut record = collect_record(name, observations);
                if let Some(kind) = supplied {
                    if record.kind.is_some_and(|k| k != kind) {
                        log::warn!(
                            "Behavior '{}' observed as {:?} but declared {}",
                            name,
                            record.kind,
                            kind
                        );
                    }
                    record.kind = Some(kind);
                }
                record
            })
            .collect::<Vec<_>>();

        let unlisted = observations
            .iter()
            .filter(|o| !names.contains(&o.name))
            .count();
        if unlisted > 0 {
            log::debug!("Dropped {} observations of unlisted behaviors", unlisted);
        }
        Ok(records)
    }
}

/// Parse every `obs` line and sort the result by time (stable).
fn parse_observations(doc: &Document) -> Result<Vec<RawObservation>> {
    let records = parse_many(doc.all("obs"));
    let names = accessor::scalars(&records, "name")?;
    let times = accessor::scalars(&records, "time")?;
    let values = accessor::optional_scalars(&records, "value")?;
    let kinds = accessor::optional_scalars(&records, "kind")?;

    let mut observations = names
        .into_iter()
        .zip(times)
        .zip(values)
        .zip(kinds)
        .map(|(((name, time), value), kind)| {
            Ok(RawObservation {
                name,
                time: parse_time(&time)?,
                value,
                kind: BehaviorKind::parse_optional(&kind)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    observations.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(observations)
}

fn parse_time(text: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(t),
        _ => Err(TinbergenError::InvalidTime(text.to_string())),
    }
}

/// Gather all observations of `name`; the kind comes from the first one.
fn collect_record(name: &str, observations: &[RawObservation]) -> BehaviorRecord {
    let mut record = BehaviorRecord::empty(name, None);
    for obs in observations.iter().filter(|o| o.name == name) {
        if record.kind.is_none() {
            record.kind = obs.kind;
        }
        record.time.push(obs.time);
        record.value.push(Value::text(obs.value.as_str()));
    }
    record
}

fn infer_records(observations: &[RawObservation]) -> Vec<BehaviorRecord> {
    let mut names: Vec<&str> = Vec::new();
    for obs in observations {
        if !names.contains(&obs.name.as_str()) {
            names.push(&obs.name);
        }
    }
    names
        .into_iter()
        .map(|name| collect_record(name, observations))
        .collect()
}
