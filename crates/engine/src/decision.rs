use serde::Serialize;

use crate::{
    attr::{ActualAttr, StoredAttr},
    config::CheckOptions,
    timestamp::{TimestampResolution, equal_truncated},
};

/// How one stored field relates to the value just computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrStatus {
    Missing,
    Same,
    Different,
}

/// Classification of a file whose content was hashed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Digest and mtime both match.
    Ok,
    /// Same mtime, different content: bitrot.
    Corrupt,
    /// Content unchanged, mtime moved.
    TimeChange,
    /// Content changed together with the mtime, or the baseline is partial.
    Outdated,
    /// Nothing usable was stored.
    New,
}

/// What to do with the stored attributes after classifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Skip,
    Store,
}

pub fn timestamp_status(
    stored: &StoredAttr,
    actual: &ActualAttr,
    resolution: TimestampResolution,
) -> AttrStatus {
    match stored.timestamp {
        None => AttrStatus::Missing,
        Some(ts) if equal_truncated(Some(ts), Some(actual.timestamp), resolution) => {
            AttrStatus::Same
        }
        Some(_) => AttrStatus::Different,
    }
}

pub fn digest_status(stored: &StoredAttr, actual: &ActualAttr) -> AttrStatus {
    match stored.digest {
        None => AttrStatus::Missing,
        Some(d) if d == actual.digest => AttrStatus::Same,
        Some(_) => AttrStatus::Different,
    }
}

/// The 3×3 decision table.
pub fn classify(ts: AttrStatus, digest: AttrStatus) -> Decision {
    use AttrStatus::{Different, Missing, Same};

    // Every pair is spelled out; adding a status must fail to compile here.
    match (ts, digest) {
        (Same, Same) => Decision::Ok,
        (Same, Different) => Decision::Corrupt,
        // Partial earlier write: treat as a fresh baseline.
        (Same, Missing) => Decision::New,
        (Different, Same) => Decision::TimeChange,
        (Different, Different) => Decision::Outdated,
        (Different, Missing) => Decision::Outdated,
        (Missing, Same) => Decision::TimeChange,
        (Missing, Different) => Decision::Outdated,
        (Missing, Missing) => Decision::New,
    }
}

/// Compare stored against actual and classify.
pub fn decide(
    stored: &StoredAttr,
    actual: &ActualAttr,
    resolution: TimestampResolution,
) -> Decision {
    classify(
        timestamp_status(stored, actual, resolution),
        digest_status(stored, actual),
    )
}

/// Whether the stored pair should be replaced by the actual one.
pub fn write_action(decision: Decision, options: &CheckOptions) -> WriteAction {
    if options.dry_run {
        return WriteAction::Skip;
    }

    match decision {
        Decision::Ok => WriteAction::Skip,
        Decision::Corrupt if options.force_fix => WriteAction::Store,
        Decision::Corrupt => WriteAction::Skip,
        Decision::TimeChange | Decision::Outdated | Decision::New => WriteAction::Store,
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
