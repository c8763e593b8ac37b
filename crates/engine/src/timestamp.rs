use std::{fmt, fs::Metadata, os::unix::fs::MetadataExt};

use serde::Serialize;

/// Placeholder printed in place of an unknown timestamp.
pub const MISSING_TIMESTAMP: &str = "----------.---------";

/// A file modification time as stored in `user.shatag.ts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Timestamp {
    pub seconds: u64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub const fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Modification time of an already-open file.
    ///
    /// Times before the epoch clamp to exactly zero.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self::from_unix(meta.mtime(), meta.mtime_nsec())
    }

    fn from_unix(seconds: i64, nanoseconds: i64) -> Self {
        match (u64::try_from(seconds), u32::try_from(nanoseconds)) {
            (Ok(seconds), Ok(nanoseconds)) => Self::new(seconds, nanoseconds),
            _ => Self::new(0, 0),
        }
    }

    /// Parse `"<seconds>[.<nanoseconds>]"`.
    ///
    /// Both parts must be plain decimal digits. The fraction is read as an
    /// integer count of nanoseconds, not as a decimal fraction, matching what
    /// earlier writers of this attribute produced.
    pub fn parse(text: &str) -> Option<Self> {
        let (secs, frac) = match text.split_once('.') {
            Some((s, f)) => (s, Some(f)),
            None => (text, None),
        };

        let seconds = parse_digits::<u64>(secs)?;
        let nanoseconds = match frac {
            Some(f) => parse_digits::<u32>(f)?,
            None => 0,
        };

        Some(Self {
            seconds,
            nanoseconds,
        })
    }
}

fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    // `str::parse` would accept a leading '+'
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// Smallest timestamp difference that survives a round trip through the
/// filesystems we expect to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampResolution {
    /// Whole seconds. The macOS SMB client drops sub-second precision.
    Coarse,
    /// 100ns, what Samba and the Linux SMB client support.
    #[default]
    Fine,
}

impl TimestampResolution {
    /// Pick the resolution for the host we are running on.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::Coarse
        } else {
            Self::Fine
        }
    }

    fn same_fraction(self, a: u32, b: u32) -> bool {
        match self {
            Self::Coarse => true,
            Self::Fine => a / 100 == b / 100,
        }
    }
}

/// Compare two timestamps at `resolution`. An unknown timestamp is never equal
/// to anything, not even another unknown one.
pub fn equal_truncated(
    a: Option<Timestamp>,
    b: Option<Timestamp>,
    resolution: TimestampResolution,
) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };

    a.seconds == b.seconds && resolution.same_fraction(a.nanoseconds, b.nanoseconds)
}

/// Display helper for an optional timestamp.
pub struct OptTimestamp(pub Option<Timestamp>);

impl fmt::Display for OptTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(ts) => write!(f, "{ts}"),
            None => f.write_str(MISSING_TIMESTAMP),
        }
    }
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
