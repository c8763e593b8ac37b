use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::report::Outcome;

pub const EXIT_OK: u8 = 0;
/// Bad command line. Produced by the cli, never by [`exit_code`].
pub const EXIT_USAGE: u8 = 1;
pub const EXIT_OPEN_ERRORS: u8 = 2;
pub const EXIT_NOT_REGULAR: u8 = 3;
pub const EXIT_WRITE_ERRORS: u8 = 4;
pub const EXIT_CORRUPT: u8 = 5;
pub const EXIT_OTHER: u8 = 6;

/// Per-outcome counters shared by all workers.
///
/// Increment only; nothing reads them until the batch is over.
#[derive(Debug, Default)]
pub struct Stats {
    ok: AtomicU64,
    corrupt: AtomicU64,
    timechange: AtomicU64,
    outdated: AtomicU64,
    new: AtomicU64,
    concurrent_modification: AtomicU64,
    errors_opening: AtomicU64,
    errors_not_regular: AtomicU64,
    errors_writing: AtomicU64,
    errors_reading: AtomicU64,
    removed: AtomicU64,
    errors_removing: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, outcome: Outcome) -> &AtomicU64 {
        match outcome {
            Outcome::Ok => &self.ok,
            Outcome::Corrupt => &self.corrupt,
            Outcome::TimeChange => &self.timechange,
            Outcome::Outdated => &self.outdated,
            Outcome::New => &self.new,
            Outcome::ConcurrentModification => &self.concurrent_modification,
            Outcome::OpenError => &self.errors_opening,
            Outcome::NotRegular => &self.errors_not_regular,
            Outcome::WriteError => &self.errors_writing,
            Outcome::ReadError => &self.errors_reading,
            Outcome::Removed => &self.removed,
            Outcome::RemoveError => &self.errors_removing,
        }
    }

    #[inline]
    pub fn record(&self, outcome: Outcome) {
        // Counters are independent; no ordering needed between them.
        self.counter(outcome).fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            ok: get(&self.ok),
            corrupt: get(&self.corrupt),
            timechange: get(&self.timechange),
            outdated: get(&self.outdated),
            new: get(&self.new),
            concurrent_modification: get(&self.concurrent_modification),
            errors_opening: get(&self.errors_opening),
            errors_not_regular: get(&self.errors_not_regular),
            errors_writing: get(&self.errors_writing),
            errors_reading: get(&self.errors_reading),
            removed: get(&self.removed),
            errors_removing: get(&self.errors_removing),
        }
    }
}

/// Final counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub ok: u64,
    pub corrupt: u64,
    pub timechange: u64,
    pub outdated: u64,
    pub new: u64,
    pub concurrent_modification: u64,
    pub errors_opening: u64,
    pub errors_not_regular: u64,
    pub errors_writing: u64,
    pub errors_reading: u64,
    pub removed: u64,
    pub errors_removing: u64,
}

impl StatsSnapshot {
    pub fn count(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Ok => self.ok,
            Outcome::Corrupt => self.corrupt,
            Outcome::TimeChange => self.timechange,
            Outcome::Outdated => self.outdated,
            Outcome::New => self.new,
            Outcome::ConcurrentModification => self.concurrent_modification,
            Outcome::OpenError => self.errors_opening,
            Outcome::NotRegular => self.errors_not_regular,
            Outcome::WriteError => self.errors_writing,
            Outcome::ReadError => self.errors_reading,
            Outcome::Removed => self.removed,
            Outcome::RemoveError => self.errors_removing,
        }
    }

    /// Number of files that reached a terminal outcome.
    pub fn total(&self) -> u64 {
        Outcome::ALL.iter().map(|&o| self.count(o)).sum()
    }

    /// Errors that don't fall in one of the dedicated exit codes.
    pub fn errors_other(&self) -> u64 {
        self.errors_reading + self.errors_removing
    }

    pub fn errors(&self) -> u64 {
        self.errors_opening + self.errors_not_regular + self.errors_writing + self.errors_other()
    }

    /// Files whose state is fine: verified, or (re)anchored, or cleaned.
    pub fn clean(&self) -> u64 {
        self.ok + self.outdated + self.timechange + self.new + self.removed
    }

    pub fn exit_code(&self) -> u8 {
        exit_code(self)
    }
}

/// Process exit status for a finished batch.
///
/// Corruption wins over everything. Otherwise a homogeneous error mix maps to
/// its own code and anything else is 6.
pub fn exit_code(s: &StatsSnapshot) -> u8 {
    if s.corrupt > 0 {
        return EXIT_CORRUPT;
    }

    let errors = s.errors();
    if errors > 0 {
        return if s.errors_opening == errors {
            EXIT_OPEN_ERRORS
        } else if s.errors_not_regular == errors {
            EXIT_NOT_REGULAR
        } else if s.errors_writing == errors {
            EXIT_WRITE_ERRORS
        } else {
            EXIT_OTHER
        };
    }

    if s.clean() == s.total() {
        EXIT_OK
    } else {
        EXIT_OTHER
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
