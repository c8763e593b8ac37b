use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Serialize, Serializer};

use crate::{
    attr::{ActualAttr, StoredAttr},
    decision::Decision,
};

/// Terminal state of one file. Exactly one per file per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Corrupt,
    TimeChange,
    Outdated,
    New,
    ConcurrentModification,
    OpenError,
    NotRegular,
    WriteError,
    /// I/O failure while hashing the content.
    ReadError,
    Removed,
    RemoveError,
}

impl Outcome {
    pub const ALL: [Outcome; 12] = [
        Outcome::Ok,
        Outcome::Corrupt,
        Outcome::TimeChange,
        Outcome::Outdated,
        Outcome::New,
        Outcome::ConcurrentModification,
        Outcome::OpenError,
        Outcome::NotRegular,
        Outcome::WriteError,
        Outcome::ReadError,
        Outcome::Removed,
        Outcome::RemoveError,
    ];

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Outcome::OpenError
                | Outcome::NotRegular
                | Outcome::WriteError
                | Outcome::ReadError
                | Outcome::RemoveError
        )
    }
}

impl From<Decision> for Outcome {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Ok => Outcome::Ok,
            Decision::Corrupt => Outcome::Corrupt,
            Decision::TimeChange => Outcome::TimeChange,
            Decision::Outdated => Outcome::Outdated,
            Decision::New => Outcome::New,
        }
    }
}

/// Time spent in the expensive stages of a check.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CheckMetrics {
    pub hash_time: Option<Duration>,
    pub write_time: Option<Duration>,
}

/// Stored and actual attributes side by side.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Comparison {
    pub stored: StoredAttr,
    pub actual: ActualAttr,
}

/// Everything the reporter needs to describe one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Serialized lossily; non UTF-8 names still produce a record.
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,
    pub outcome: Outcome,
    /// Classification, when hashing got that far. Survives a failed write.
    pub decision: Option<Decision>,
    pub comparison: Option<Comparison>,
    /// Whether the stored attributes were replaced.
    pub updated: bool,
    /// Set when the check ran with `force_fix`.
    pub fix_requested: bool,
    /// Message for the error stream.
    pub error: Option<String>,
    #[serde(skip)]
    pub metrics: CheckMetrics,
}

fn serialize_path_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

impl FileReport {
    pub fn new(path: PathBuf, outcome: Outcome) -> Self {
        Self {
            path,
            outcome,
            decision: None,
            comparison: None,
            updated: false,
            fix_requested: false,
            error: None,
            metrics: CheckMetrics::default(),
        }
    }

    pub fn with_error(mut self, err: impl ToString) -> Self {
        self.error = Some(err.to_string());
        self
    }
}
