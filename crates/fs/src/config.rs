use std::time::Duration;

/// How long a blocked send or receive waits before re-checking cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
