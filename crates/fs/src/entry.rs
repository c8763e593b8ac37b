use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use crossbeam::channel::{SendTimeoutError, Sender};

use crate::config::POLL_INTERVAL;

/// Work item handed from the path sources to the check workers.
#[derive(Debug)]
pub enum Entry {
    /// Regular file to check.
    File(PathBuf),
    /// Non-regular entry met during a recursive walk. Reported, not counted.
    Skipped(PathBuf),
    /// Argument that can't be checked.
    NotRegular { path: PathBuf, kind: NotRegularKind },
    /// Path that couldn't be examined at all.
    Unreadable { path: PathBuf, error: io::Error },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File(path) | Entry::Skipped(path) => path,
            Entry::NotRegular { path, .. } | Entry::Unreadable { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotRegularKind {
    Directory,
    Special,
}

impl fmt::Display for NotRegularKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotRegularKind::Directory => {
                f.write_str("is a directory, did you mean to use the '--recursive' option?")
            }
            NotRegularKind::Special => f.write_str("is not a regular file"),
        }
    }
}

/// Send `entry`, waking up periodically to honour `cancel`.
///
/// Returns false when the entry was not delivered, either because the batch
/// was cancelled or because every receiver is gone. Producers stop on false.
pub fn send_entry(tx: &Sender<Entry>, entry: Entry, cancel: &AtomicBool) -> bool {
    let mut entry = entry;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        match tx.send_timeout(entry, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => entry = back,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
