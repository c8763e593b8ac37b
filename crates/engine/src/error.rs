//! Error types for shatag-engine.
//!
//! Everything here is per-file: the pipeline turns each error into an
//! [`Outcome`](crate::Outcome) and the batch carries on with the next file.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::timestamp::Timestamp;

/// Why a stored digest attribute was ignored. Never fatal; the digest is
/// treated as missing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    #[error("incomplete value ({len} bytes)")]
    Incomplete { len: usize },

    #[error("ignoring trailing garbage ({extra} bytes)")]
    TrailingGarbage { extra: usize },

    #[error("hex decode: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Failure to compute the actual attributes of an open file.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The mtime moved while the content was being hashed, so the digest
    /// does not describe any single version of the file.
    #[error("modified while hashing (mtime {before} -> {after})")]
    ConcurrentModification { before: Timestamp, after: Timestamp },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Outcome of deleting both attributes. Each one is removed independently,
/// so either, both or neither may have failed.
#[derive(Debug, Default)]
pub struct RemovalError {
    pub digest: Option<io::Error>,
    pub timestamp: Option<io::Error>,
}

impl RemovalError {
    pub fn is_empty(&self) -> bool {
        self.digest.is_none() && self.timestamp.is_none()
    }

    pub fn both_failed(&self) -> bool {
        self.digest.is_some() && self.timestamp.is_some()
    }
}

impl std::fmt::Display for RemovalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.timestamp, &self.digest) {
            (Some(ts), Some(digest)) => {
                write!(f, "removing timestamp: {ts}; removing digest: {digest}")
            }
            (Some(ts), None) => write!(f, "removing timestamp: {ts}"),
            (None, Some(digest)) => write!(f, "removing digest: {digest}"),
            (None, None) => f.write_str("no error"),
        }
    }
}

impl std::error::Error for RemovalError {}

/// Per-file error as shown to the operator.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("{:?} is not a regular file", .path)]
    NotRegular { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{}: writing attributes: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("{}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: RemovalError,
    },
}
