//! Document loaders
//!
//! This module provides loaders that turn the line/keyval structure of a
//! Tinbergen file into typed domain records.

mod ethogram;
mod observation;
mod project;

pub use ethogram::EthogramLoader;
pub use observation::ObservationLoader;
pub use project::ProjectLoader;

use crate::error::Result;
use crate::reader::Document;
use std::path::{Component, Path, PathBuf};

/// Trait for document loaders
pub trait DocumentLoader {
    type Output;

    /// Build the record from parsed entries. `origin` is the path the
    /// document was read from, if any; relative paths inside the document
    /// are resolved against its directory.
    fn parse(&self, doc: &Document, origin: Option<&Path>) -> Result<Self::Output>;

    /// Parse document text that did not come from a file
    fn parse_str(&self, text: &str) -> Result<Self::Output> {
        let doc = Document::parse(text)?;
        self.parse(&doc, None)
    }

    /// Read and parse a file
    fn load(&self, path: &Path) -> Result<Self::Output> {
        let doc = Document::read(path)?;
        self.parse(&doc, Some(path))
    }
}

/// Join `relative` onto the directory containing `origin` and normalize
/// `.`/`..` lexically. Absolute `relative` paths are returned normalized.
pub(crate) fn resolve_relative(origin: Option<&Path>, relative: &str) -> PathBuf {
    let base = origin.and_then(Path::parent).unwrap_or_else(|| Path::new(""));
    normalize(&base.join(relative))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
