use crate::timestamp::TimestampResolution;

/// Per-file behaviour switches shared by every worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Classify and report, but never touch stored attributes.
    pub dry_run: bool,
    /// Overwrite the stored digest of a file classified as corrupt.
    pub force_fix: bool,
    /// Timestamp granularity used when comparing stored and actual mtimes.
    pub resolution: TimestampResolution,
}

impl CheckOptions {
    /// Options with the timestamp resolution detected for this host.
    pub fn detect() -> Self {
        Self {
            resolution: TimestampResolution::detect(),
            ..Self::default()
        }
    }
}
