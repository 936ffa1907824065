//! Ethogram file loader
//!
//! ```text
//! name: Foraging study
//! behavior: name=Peck kind=moment
//! behavior: name=Arousal kind=state values=sleeping,resting,moving
//! behavior: name=Grooming kind=binary
//! behavior: name=Count kind=variable
//! code: symbol=g name=Grooming value=True
//! code: symbol=n name=Count args=value
//! ```

use super::DocumentLoader;
use crate::error::{Result, TinbergenError};
use crate::keyval::{accessor, parse_many, KeyvalRecord};
use crate::reader::Document;
use crate::types::{Behavior, BehaviorKind, Code, Ethogram};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Keys of a `code` line that are not copied into the code's extras
const CODE_RESERVED_KEYS: [&str; 3] = ["symbol", "name", "args"];

/// Loader for `.tbethogram` files
#[derive(Debug, Clone, Copy, Default)]
pub struct EthogramLoader;

impl DocumentLoader for EthogramLoader {
    type Output = Ethogram;

    fn parse(&self, doc: &Document, _origin: Option<&Path>) -> Result<Ethogram> {
        let name = doc.require("name")?.to_string();
        let behaviors = parse_behaviors(&parse_many(doc.all("behavior")))?;
        let codes = parse_codes(&parse_many(doc.all("code")))?;

        for code in &codes {
            if !behaviors.iter().any(|b| b.name == code.name) {
                log::warn!(
                    "Code '{}' in ethogram '{}' refers to unknown behavior '{}'",
                    code.symbol,
                    name,
                    code.name
                );
            }
        }

        Ok(Ethogram {
            name,
            behaviors,
            codes,
        })
    }
}

fn parse_behaviors(records: &[KeyvalRecord]) -> Result<Vec<Behavior>> {
    let names = accessor::scalars(records, "name")?;
    let kinds = accessor::scalars(records, "kind")?;
    let values = accessor::lists(records, "values");

    let mut seen = HashSet::new();
    let mut behaviors = Vec::with_capacity(names.len());
    for ((name, kind), allowed) in names.into_iter().zip(kinds).zip(values) {
        if !seen.insert(name.clone()) {
            return Err(TinbergenError::DuplicateBehavior(name));
        }
        let kind: BehaviorKind = kind.parse()?;
        let allowed_values = if kind == BehaviorKind::State {
            allowed
        } else {
            Vec::new()
        };
        behaviors.push(Behavior {
            name,
            kind,
            allowed_values,
        });
    }
    Ok(behaviors)
}

fn parse_codes(records: &[KeyvalRecord]) -> Result<Vec<Code>> {
    records
        .iter()
        .map(|record| {
            let mut extra = BTreeMap::new();
            for (key, items) in record.iter() {
                if !CODE_RESERVED_KEYS.contains(&key) && !extra.contains_key(key) {
                    extra.insert(key.to_string(), items.join(","));
                }
            }
            Ok(Code {
                symbol: accessor::scalar_of(record, "symbol")?,
                name: accessor::scalar_of(record, "name")?,
                args: accessor::list_of(record, "args"),
                extra,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ETHOGRAM: &str = r#"
name: Foraging study
behavior: name=Peck kind=moment
behavior: name=Arousal kind=state values=sleeping,resting,moving
behavior: name=Grooming kind=binary values=ignored
behavior: name="Flock size" kind=variable
code: symbol=p name=Peck
code: symbol=g name=Grooming value=True
code: symbol=n name="Flock size" args=value
"#;

    #[test]
    fn test_parse_ethogram() {
        let ethogram = EthogramLoader.parse_str(ETHOGRAM).unwrap();

        assert_eq!(ethogram.name, "Foraging study");
        assert_eq!(
            ethogram.behavior_names(),
            vec!["Peck", "Arousal", "Grooming", "Flock size"]
        );
        assert_eq!(
            ethogram.behavior_kinds(),
            vec![
                Some(BehaviorKind::Moment),
                Some(BehaviorKind::State),
                Some(BehaviorKind::Binary),
                Some(BehaviorKind::Variable)
            ]
        );

        let arousal = ethogram.behavior("Arousal").unwrap();
        assert_eq!(arousal.allowed_values, vec!["sleeping", "resting", "moving"]);
        // Allowed values are only kept for state behaviors
        assert!(ethogram.behavior("Grooming").unwrap().allowed_values.is_empty());
    }

    #[test]
    fn test_parse_codes() {
        let ethogram = EthogramLoader.parse_str(ETHOGRAM).unwrap();

        assert_eq!(ethogram.codes.len(), 3);
        let g = ethogram.code("g").unwrap();
        assert_eq!(g.name, "Grooming");
        assert_eq!(g.extra.get("value").map(String::as_str), Some("True"));

        let n = ethogram.code("n").unwrap();
        assert_eq!(n.args, vec!["value"]);
        assert!(n.extra.is_empty());

        let proto = ethogram.parse_entry("n 12");
        assert_eq!(proto["name"], "Flock size");
        assert_eq!(proto["value"], "12");
    }

    #[test]
    fn test_invalid_kind() {
        let result = EthogramLoader.parse_str("name: x\nbehavior: name=a kind=dance\n");
        assert!(matches!(result, Err(TinbergenError::InvalidKind(ref k)) if k == "dance"));
    }

    #[test]
    fn test_duplicate_behavior() {
        let result = EthogramLoader
            .parse_str("name: x\nbehavior: name=a kind=moment\nbehavior: name=a kind=binary\n");
        assert!(matches!(result, Err(TinbergenError::DuplicateBehavior(ref n)) if n == "a"));
    }

    #[test]
    fn test_empty_ethogram() {
        let ethogram = EthogramLoader.parse_str("name: empty\n").unwrap();
        assert!(ethogram.behaviors.is_empty());
        assert!(EthogramLoader.parse_str("# nothing\n").is_err());
    }
}
