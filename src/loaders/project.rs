//! Project file loader
//!
//! ```text
//! project-root: observations
//! video-root: ../videos
//! ethogram-file: study.tbethogram
//! observer: name="Ada Lovelace" code=AL
//! ```

use super::{resolve_relative, DocumentLoader};
use crate::error::{Result, TinbergenError};
use crate::keyval::{accessor, parse_many};
use crate::reader::Document;
use crate::types::{Observer, Project};
use std::collections::HashSet;
use std::path::Path;

/// Loader for `.tbproject` files
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLoader;

impl DocumentLoader for ProjectLoader {
    type Output = Project;

    fn parse(&self, doc: &Document, origin: Option<&Path>) -> Result<Project> {
        let project_root = resolve_relative(origin, doc.require("project-root")?);
        let video_root = resolve_relative(origin, doc.require("video-root")?);
        let ethogram_file = resolve_relative(origin, doc.require("ethogram-file")?);

        let records = parse_many(doc.all("observer"));
        let names = accessor::scalars(&records, "name")?;
        let codes = accessor::scalars(&records, "code")?;

        // One name and one code per observer line
        let mut seen = HashSet::new();
        let mut observers = Vec::with_capacity(names.len());
        for (name, code) in names.into_iter().zip(codes) {
            if !seen.insert(code.clone()) {
                return Err(TinbergenError::DuplicateObserver(code));
            }
            observers.push(Observer { name, code });
        }

        Ok(Project {
            project_root,
            video_root,
            ethogram_file,
            observers,
        })
    }
}
