use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use crossbeam::channel::Sender;
use log::debug;

use crate::{
    entry::{Entry, NotRegularKind, send_entry},
    walker::walk_parallel,
};

/// What a command-line argument turns into.
#[derive(Debug)]
pub enum Source {
    Entry(Entry),
    /// Directory to descend into.
    Walk(PathBuf),
}

/// Classify one argument without following symlinks.
pub fn classify_arg(path: &Path, recursive: bool) -> Source {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(error) => {
            return Source::Entry(Entry::Unreadable {
                path: path.to_path_buf(),
                error,
            });
        }
    };

    let ft = meta.file_type();
    if ft.is_file() {
        Source::Entry(Entry::File(path.to_path_buf()))
    } else if ft.is_dir() && recursive {
        Source::Walk(path.to_path_buf())
    } else {
        let kind = if ft.is_dir() {
            NotRegularKind::Directory
        } else {
            NotRegularKind::Special
        };
        Source::Entry(Entry::NotRegular {
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// Turn every argument into work items on `tx`, in argument order.
///
/// Directories are walked with `walk_threads` threads when `recursive` is
/// set. Stops early on cancellation or once nobody is receiving.
pub fn feed_args(
    args: &[PathBuf],
    recursive: bool,
    tx: &Sender<Entry>,
    cancel: &AtomicBool,
    walk_threads: usize,
) {
    for arg in args {
        if cancel.load(Ordering::Relaxed) {
            debug!("[sources] cancelled before {arg:?}");
            return;
        }

        match classify_arg(arg, recursive) {
            Source::Entry(entry) => {
                if !send_entry(tx, entry, cancel) {
                    return;
                }
            }
            Source::Walk(root) => walk_parallel(vec![root], tx, cancel, walk_threads),
        }
    }
}

#[cfg(test)]
#[path = "sources_tests.rs"]
mod tests;
