//! Typed change records and the ordered collection that holds them.
//!
//! A [`ChangeRecord`] is one file's line-level diff within one commit; all
//! records from one commit share the commit's timestamp and author composite.
//! A [`RecordCollection`] is the sorted sequence produced per repository by
//! the parser, merged by the report generator, and persisted as JSON.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel used when a commit carries no author name.
pub const UNKNOWN_NAME: &str = "Unknown Name";
/// Sentinel used when a commit carries no author email.
pub const UNKNOWN_EMAIL: &str = "Unknown Email";

/// Build the canonical `"Name (email)"` author composite. Name and email are
/// defaulted independently when empty.
pub fn author_composite(name: &str, email: &str) -> String {
    let name = if name.is_empty() { UNKNOWN_NAME } else { name };
    let email = if email.is_empty() { UNKNOWN_EMAIL } else { email };
    format!("{name} ({email})").trim().to_string()
}

/// One file's line-level diff within one commit.
///
/// Fields are private so that `diff` is always `plus - minus`: the only
/// mutator for the counts is [`ChangeRecord::set_counts`], which recomputes
/// it. Author rewrites go through the copying [`ChangeRecord::with_author`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    date: NaiveDateTime,
    author: String,
    path: String,
    plus: i64,
    minus: i64,
    diff: i64,
}

impl ChangeRecord {
    /// A fresh record carrying commit identity only; counts start at zero.
    pub fn new(date: NaiveDateTime, author: impl Into<String>) -> Self {
        Self {
            date,
            author: author.into(),
            path: String::new(),
            plus: 0,
            minus: 0,
            diff: 0,
        }
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn plus(&self) -> i64 {
        self.plus
    }

    pub fn minus(&self) -> i64 {
        self.minus
    }

    pub fn diff(&self) -> i64 {
        self.diff
    }

    /// Set added/removed line counts, recomputing `diff`.
    pub fn set_counts(&mut self, plus: i64, minus: i64) {
        self.plus = plus;
        self.minus = minus;
        self.diff = plus - minus;
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Copy of this record with the author identity replaced.
    pub fn with_author(&self, author: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.author = author.into();
        copy
    }

    fn sort_key(&self) -> (&str, NaiveDateTime, &str, i64) {
        (&self.author, self.date, &self.path, self.diff)
    }
}

/// Errors from persisting or reloading a collection.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem access failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The collection could not be encoded.
    Encode { source: serde_json::Error },
    /// The persisted file could not be decoded.
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "report file {}: {}", path.display(), source)
            }
            StoreError::Encode { source } => {
                write!(f, "encoding report failed: {}", source)
            }
            StoreError::Decode { path, source } => {
                write!(f, "report file {} is not a valid report: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Encode { source } | StoreError::Decode { source, .. } => Some(source),
        }
    }
}

/// Ordered sequence of change records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordCollection {
    records: Vec<ChangeRecord>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    /// Concatenate another collection onto this one. No re-sort: merged
    /// slices stay in per-repository order.
    pub fn append(&mut self, other: RecordCollection) {
        self.records.extend(other.records);
    }

    /// Stable sort by (author, date, path, diff) ascending, each key breaking
    /// ties in the prior one.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// Persist the collection to `path` as JSON, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        if path.exists() {
            std::fs::remove_file(path).map_err(io_err)?;
        }

        let encoded =
            serde_json::to_vec_pretty(self).map_err(|source| StoreError::Encode { source })?;
        std::fs::write(path, encoded).map_err(io_err)
    }

    /// Reload a collection persisted by [`RecordCollection::save`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl IntoIterator for RecordCollection {
    type Item = ChangeRecord;
    type IntoIter = std::vec::IntoIter<ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<ChangeRecord> for RecordCollection {
    fn from_iter<I: IntoIterator<Item = ChangeRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
