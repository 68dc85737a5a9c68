//! Ordered class-name table.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::LabelError;

/// Returned for a predicted index the table has no entry for.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Class names indexed by model output position.
///
/// Never empty. Its length is not checked against the model's output size;
/// out-of-range indices resolve to [`UNKNOWN_LABEL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Loads one label per line from a UTF-8 text file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LabelError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Parses labels from `reader`. `source` names the origin in errors.
    ///
    /// Lines are trimmed; blank lines are skipped; order is kept as read.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, LabelError> {
        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| LabelError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;
            let line = line.trim();
            if !line.is_empty() {
                labels.push(line.to_string());
            }
        }

        if labels.is_empty() {
            return Err(LabelError::Empty {
                path: source.to_path_buf(),
            });
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a loaded table.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Returns the label at `index`, or [`UNKNOWN_LABEL`] when out of range.
    pub fn resolve(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
