use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use anyhow::{Error, Result};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use log::{debug, info};
use shatag_engine::{
    AttrStore, CheckError, Checker, FileReport, Outcome, Probe, Stats, StatsSnapshot,
};
use shatag_fs::{Entry, POLL_INTERVAL, feed_args};
use shatag_runtime::{QUEUE_DEPTH_PER_WORKER, default_concurrency};

/// Receives every per-file result. Called concurrently from all workers.
pub trait Reporter: Sync {
    fn report(&self, report: &FileReport);

    /// Non-regular entry met during a recursive walk. Not counted.
    fn skipped(&self, _path: &Path) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Check,
    Remove,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Worker threads. Also used for the directory walker.
    pub concurrency: usize,
    pub recursive: bool,
    pub mode: Mode,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            recursive: false,
            mode: Mode::Check,
        }
    }
}

/// Check (or clean) every file named by `args` and return the final counts.
///
/// One producer thread classifies the arguments and walks directories into a
/// bounded queue; `concurrency` workers drain it. Once `cancel` is set,
/// files already being checked finish and everything still queued is dropped
/// without being reported or counted.
pub fn run_batch<S, P, R>(
    args: &[PathBuf],
    opts: &BatchOptions,
    checker: &Checker<S, P>,
    reporter: &R,
    cancel: &AtomicBool,
) -> Result<StatsSnapshot>
where
    S: AttrStore,
    P: Probe,
    R: Reporter + ?Sized,
{
    let workers = opts.concurrency.max(1);
    let (entry_tx, entry_rx) = channel::bounded::<Entry>(workers * QUEUE_DEPTH_PER_WORKER);
    let stats = Stats::new();

    info!(
        "[pool] {} argument(s), {workers} worker(s), mode {:?}",
        args.len(),
        opts.mode
    );

    thread::scope(|s| {
        let producer = s.spawn(move || {
            feed_args(args, opts.recursive, &entry_tx, cancel, workers);
            debug!("[pool] producer done");
            // entry_tx dropped here; workers see the queue close.
        });

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let worker = Worker {
                    rx: entry_rx.clone(),
                    mode: opts.mode,
                    checker,
                    reporter,
                    stats: &stats,
                    cancel,
                };
                s.spawn(move || worker.run())
            })
            .collect();
        drop(entry_rx);

        producer
            .join()
            .map_err(|_| Error::msg("path producer thread panicked"))?;
        for h in handles {
            h.join()
                .map_err(|_| Error::msg("check worker thread panicked"))?;
        }
        Ok::<(), Error>(())
    })?;

    let snapshot = stats.snapshot();
    debug!(
        "[pool] finished: {} file(s), cancelled: {}",
        snapshot.total(),
        cancel.load(Ordering::Relaxed)
    );
    Ok(snapshot)
}

struct Worker<'a, S, P, R: ?Sized> {
    rx: Receiver<Entry>,
    mode: Mode,
    checker: &'a Checker<S, P>,
    reporter: &'a R,
    stats: &'a Stats,
    cancel: &'a AtomicBool,
}

impl<S: AttrStore, P: Probe, R: Reporter + ?Sized> Worker<'_, S, P, R> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn run(self) {
        loop {
            if self.cancelled() {
                debug!("[pool] worker stopping on cancel");
                return;
            }

            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(entry) => self.handle(entry),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn handle(&self, entry: Entry) {
        let report = match entry {
            Entry::File(path) => {
                // Last chance to drop the item before touching the file.
                if self.cancelled() {
                    return;
                }
                match self.mode {
                    Mode::Check => self.checker.check(&path),
                    Mode::Remove => self.checker.remove(&path),
                }
            }
            Entry::Skipped(path) => {
                self.reporter.skipped(&path);
                return;
            }
            Entry::NotRegular { path, kind } => {
                let msg = format!("{path:?} {kind}");
                FileReport::new(path, Outcome::NotRegular).with_error(msg)
            }
            Entry::Unreadable { path, error } => {
                let err = CheckError::Open {
                    path: path.clone(),
                    source: error,
                };
                FileReport::new(path, Outcome::OpenError).with_error(err)
            }
        };

        self.reporter.report(&report);
        self.stats.record(report.outcome);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
