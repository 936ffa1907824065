//! Project aggregation
//!
//! Loads a project file, its ethogram, and every observation file under the
//! project root, then converts observation values to their typed form.

use crate::convert::ValueConverter;
use crate::error::{Result, TinbergenError};
use crate::loaders::{DocumentLoader, EthogramLoader, ObservationLoader, ProjectLoader};
use crate::types::{Ethogram, ObservationSet, Project, OBSERVATION_SUFFIX};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything loaded from one project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectData {
    pub project: Project,
    pub ethogram: Ethogram,
    /// One set per observation file, ordered by file path
    pub observations: Vec<ObservationSet>,
}

impl ProjectData {
    /// Observation sets coded by `observer` (name or code as written in the file)
    pub fn by_observer<'a>(&'a self, observer: &'a str) -> impl Iterator<Item = &'a ObservationSet> + 'a {
        self.observations.iter().filter(move |s| s.observer == observer)
    }

    /// Observation sets coded for `source`
    pub fn by_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a ObservationSet> + 'a {
        self.observations.iter().filter(move |s| s.source == source)
    }
}

/// Load a whole project.
///
/// Every observation set is built against the ethogram's full behavior list,
/// so all sets share the same records in the same order.
pub fn load_project(path: &Path, converter: &ValueConverter) -> Result<ProjectData> {
    let project = ProjectLoader.load(path)?;
    let ethogram = EthogramLoader.load(&project.ethogram_file)?;
    let loader = ObservationLoader::for_ethogram(&ethogram);

    let files = observation_files(&project.project_root)?;
    log::info!(
        "Loading {} observation files from {}",
        files.len(),
        project.project_root.display()
    );

    let mut observations = Vec::with_capacity(files.len());
    for file in &files {
        let set = loader.load(file)?;
        log::debug!(
            "Loaded {} ({} observations by '{}')",
            file.display(),
            set.observation_count(),
            set.observer
        );
        if !project.has_observer(&set.observer) {
            log::warn!(
                "Observer '{}' in {} is not declared in the project",
                set.observer,
                file.display()
            );
        }
        observations.push(set);
    }

    let observations = converter.convert_all(observations)?;
    Ok(ProjectData {
        project,
        ethogram,
        observations,
    })
}

/// All `.tbobs` files below `root`, sorted by full path. A missing root
/// yields no files. Symlinked directories are not descended into, so each
/// file is listed once.
pub fn observation_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        log::warn!("Project root {} is not a directory", root.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_err = |source| TinbergenError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        // file_type does not follow symlinks
        let file_type = entry.file_type().map_err(io_err)?;
        let path = entry.path();
        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_symlink() && path.is_dir() {
            log::debug!("Skipping symlinked directory {}", path.display());
        } else if path.extension().is_some_and(|ext| ext == OBSERVATION_SUFFIX) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BehaviorKind, Value};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const ETHOGRAM: &str = "name: Foraging\n\
        behavior: name=Grooming kind=binary\n\
        behavior: name=Count kind=variable\n\
        behavior: name=Peck kind=moment\n";

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let project = write(
            dir.path(),
            "study.tbproject",
            "project-root: obs\n\
             video-root: videos\n\
             ethogram-file: study.tbethogram\n\
             observer: name=\"Ada Lovelace\" code=AL\n",
        );
        write(dir.path(), "study.tbethogram", ETHOGRAM);
        write(
            dir.path(),
            "obs/site2/b.mp4.AL.tbobs",
            "observer: AL\nsource: site2/b.mp4\n\
             obs: name=Grooming kind=binary time=1.0 value=True\n",
        );
        write(
            dir.path(),
            "obs/site1/a.mp4.GB.tbobs",
            "observer: GB\nsource: site1/a.mp4\n\
             obs: name=Count kind=variable time=0.5 value=4\n\
             obs: name=Grooming kind=binary time=0.2 value=False\n",
        );
        write(dir.path(), "obs/notes.txt", "not an observation file");
        (dir, project)
    }

    #[test]
    fn test_load_project() {
        let (_dir, path) = fixture();
        let data = load_project(&path, &ValueConverter::default()).unwrap();

        assert_eq!(data.ethogram.name, "Foraging");
        assert_eq!(data.project.observer_code("Ada Lovelace"), Some("AL"));

        let sources: Vec<&str> = data.observations.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["site1/a.mp4", "site2/b.mp4"]);

        for set in &data.observations {
            let names: Vec<&str> = set.behavior_records.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["Grooming", "Count", "Peck"]);
            for record in &set.behavior_records {
                assert_eq!(record.time.len(), record.value.len());
                assert!(record.time.windows(2).all(|w| w[0] <= w[1]));
            }
        }

        let first = &data.observations[0];
        assert_eq!(first.record("Grooming").unwrap().value, vec![Value::Bool(false)]);
        // Count has no converter and stays text
        assert_eq!(first.record("Count").unwrap().value, vec![Value::text("4")]);

        let second = &data.observations[1];
        let count = second.record("Count").unwrap();
        assert_eq!(count.kind, Some(BehaviorKind::Variable));
        assert!(count.is_empty());

        assert_eq!(data.by_observer("AL").count(), 1);
        assert_eq!(data.by_source("site1/a.mp4").count(), 1);
    }

    #[test]
    fn test_load_project_is_deterministic() {
        let (_dir, path) = fixture();
        let converter = ValueConverter::default();
        let first = load_project(&path, &converter).unwrap();
        let second = load_project(&path, &converter).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_and_missing_roots() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "study.tbethogram", ETHOGRAM);
        fs::create_dir(dir.path().join("empty")).unwrap();
        let empty = write(
            dir.path(),
            "empty.tbproject",
            "project-root: empty\nvideo-root: .\nethogram-file: study.tbethogram\n",
        );
        let missing = write(
            dir.path(),
            "missing.tbproject",
            "project-root: nowhere\nvideo-root: .\nethogram-file: study.tbethogram\n",
        );

        let converter = ValueConverter::default();
        assert!(load_project(&empty, &converter).unwrap().observations.is_empty());
        assert!(load_project(&missing, &converter).unwrap().observations.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_walked() {
        let dir = TempDir::new().unwrap();
        let obs = dir.path().join("obs");
        write(&obs, "a.mp4.AL.tbobs", "observer: AL\nsource: a.mp4\n");
        std::os::unix::fs::symlink(&obs, obs.join("loop")).unwrap();
        std::os::unix::fs::symlink(obs.join("a.mp4.AL.tbobs"), obs.join("b.mp4.AL.tbobs"))
            .unwrap();

        let files = observation_files(&obs).unwrap();
        // The linked file is kept; the directory cycle is not followed
        assert_eq!(
            files,
            vec![obs.join("a.mp4.AL.tbobs"), obs.join("b.mp4.AL.tbobs")]
        );
    }

    #[test]
    fn test_missing_ethogram_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "study.tbproject",
            "project-root: .\nvideo-root: .\nethogram-file: absent.tbethogram\n",
        );
        let result = load_project(&path, &ValueConverter::default());
        assert!(matches!(result, Err(TinbergenError::Io { .. })));
    }
}
