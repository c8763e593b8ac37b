use std::thread;

pub const PROGRAM_NAME: &str = "shatag";
pub const PROGRAM_LOG_LEVEL: &str = "SHATAG_LOG_LEVEL";

/// Extended attribute holding the lowercase hex sha256 of the content.
pub const XATTR_SHA256: &str = "user.shatag.sha256";
/// Extended attribute holding the mtime as `SSSSSSSSSS.NNNNNNNNN`.
pub const XATTR_TS: &str = "user.shatag.ts";

/// Read buffer for streaming file content through the hasher.
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Work queue slots per worker thread.
/// Keeps producers a little ahead of the workers without buffering a whole tree.
pub const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Number of worker threads used when the operator does not pick one.
pub fn default_concurrency() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
