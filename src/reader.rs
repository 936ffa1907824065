//! Line reader
//!
//! All three Tinbergen file kinds share one line convention: `# ...` is a
//! comment and every other non-blank line is `entry: value`.

use crate::error::{Result, TinbergenError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One `entry: value` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub entry: String,
    pub value: String,
}

/// Split file text into entries, dropping blank lines and comments.
pub fn parse_entries(text: &str) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((head, tail)) = trimmed.split_once(':') else {
            return Err(TinbergenError::FormatError {
                line: line_num + 1,
                text: trimmed.to_string(),
            });
        };
        entries.push(Entry {
            entry: head.trim().to_string(),
            value: tail.trim().to_string(),
        });
    }
    Ok(entries)
}

/// Read a file and split it into entries.
pub fn read_entries(path: &Path) -> Result<Vec<Entry>> {
    let text = fs::read_to_string(path).map_err(|source| TinbergenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_entries(&text)
}

/// The entries of one file, with lookup helpers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: Vec<Entry>,
}

impl Document {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn parse(text: &str) -> Result<Self> {
        parse_entries(text).map(Self::new)
    }

    pub fn read(path: &Path) -> Result<Self> {
        read_entries(path).map(Self::new)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Value of the first line with this entry name
    pub fn scalar(&self, entry: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.entry == entry)
            .map(|e| e.value.as_str())
    }

    /// Like [`Document::scalar`], failing with `MissingEntry` when absent
    pub fn require(&self, entry: &str) -> Result<&str> {
        self.scalar(entry)
            .ok_or_else(|| TinbergenError::MissingEntry(entry.to_string()))
    }

    /// Values of every line with this entry name, in file order
    pub fn all(&self, entry: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.entry == entry)
            .map(|e| e.value.as_str())
            .collect()
    }
}
