use std::{
    fs::{self, read_dir},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::{
    config::POLL_INTERVAL,
    entry::{Entry, send_entry},
};

/// Multi-threaded directory walk.
///
/// Worker threads share an unbounded queue of directories; each one lists a
/// directory, queues its subdirectories and sends everything else to
/// `entry_tx`. Symlinks are reported as [`Entry::Skipped`], never followed.
///
/// Returns once every directory is listed, `cancel` is set, or `entry_tx` has
/// no receivers left.
pub fn walk_parallel(
    roots: Vec<PathBuf>,
    entry_tx: &Sender<Entry>,
    cancel: &AtomicBool,
    num_threads: usize,
) {
    if roots.is_empty() {
        return;
    }

    let (work_tx, work_rx) = channel::unbounded::<PathBuf>();

    // Directories queued or being listed. Zero means the walk is over.
    let pending = AtomicUsize::new(roots.len());
    // Set when a send fails; stops the other workers too.
    let halted = AtomicBool::new(false);

    for root in roots {
        let _ = work_tx.send(root);
    }

    let num_threads = num_threads.max(1);
    debug!("[walk_parallel] starting with {num_threads} threads");

    thread::scope(|s| {
        for _ in 0..num_threads {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let shared = Shared {
                entry_tx,
                cancel,
                halted: &halted,
                pending: &pending,
            };

            s.spawn(move || worker_loop(&work_rx, &work_tx, &shared));
        }
    });

    debug!(
        "[walk_parallel] done (cancelled: {}, halted: {})",
        cancel.load(Ordering::Relaxed),
        halted.load(Ordering::Relaxed)
    );
}

struct Shared<'a> {
    entry_tx: &'a Sender<Entry>,
    cancel: &'a AtomicBool,
    halted: &'a AtomicBool,
    pending: &'a AtomicUsize,
}

impl Shared<'_> {
    fn stopped(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.halted.load(Ordering::Relaxed)
    }

    fn emit(&self, entry: Entry) -> bool {
        if send_entry(self.entry_tx, entry, self.cancel) {
            true
        } else {
            self.halted.store(true, Ordering::Relaxed);
            false
        }
    }
}

fn worker_loop(work_rx: &Receiver<PathBuf>, work_tx: &Sender<PathBuf>, shared: &Shared<'_>) {
    loop {
        if shared.stopped() {
            break;
        }

        match work_rx.recv_timeout(POLL_INTERVAL) {
            Ok(dir) => {
                scan_dir(&dir, work_tx, shared);

                if shared.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                    // Last directory; idle workers notice on their next timeout.
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if shared.pending.load(Ordering::Acquire) == 0 {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// List one directory. Subdirectories go back on the work queue; every other
/// entry is sent out.
fn scan_dir(dir: &Path, work_tx: &Sender<PathBuf>, shared: &Shared<'_>) {
    let rd = match read_dir(dir) {
        Ok(rd) => rd,
        Err(error) => {
            warn!("[walk] read_dir({dir:?}) failed: {error}");
            shared.emit(Entry::Unreadable {
                path: dir.to_path_buf(),
                error,
            });
            return;
        }
    };

    for entry_res in rd {
        if shared.stopped() {
            return;
        }

        let dir_entry = match entry_res {
            Ok(e) => e,
            Err(error) => {
                warn!("[walk] error reading entry in {dir:?}: {error}");
                if !shared.emit(Entry::Unreadable {
                    path: dir.to_path_buf(),
                    error,
                }) {
                    return;
                }
                continue;
            }
        };

        let entry = match inspect_entry(&dir_entry) {
            Inspected::Dir(path) => {
                shared.pending.fetch_add(1, Ordering::AcqRel);
                let _ = work_tx.send(path);
                continue;
            }
            Inspected::Entry(entry) => entry,
        };

        if !shared.emit(entry) {
            return;
        }
    }
}

enum Inspected {
    Dir(PathBuf),
    Entry(Entry),
}

/// Classify without following symlinks.
fn inspect_entry(dir_entry: &fs::DirEntry) -> Inspected {
    let path = dir_entry.path();
    match dir_entry.file_type() {
        Ok(ft) if ft.is_dir() => Inspected::Dir(path),
        Ok(ft) if ft.is_file() => Inspected::Entry(Entry::File(path)),
        Ok(_) => Inspected::Entry(Entry::Skipped(path)),
        Err(error) => Inspected::Entry(Entry::Unreadable { path, error }),
    }
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
