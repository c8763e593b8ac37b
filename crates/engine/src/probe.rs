use std::{
    fs::File,
    io::{self, Read},
};

use sha2::{Digest as _, Sha256};
use shatag_runtime::HASH_BUFFER_SIZE;

use crate::{
    attr::{ActualAttr, Digest},
    error::ProbeError,
    timestamp::Timestamp,
};

/// Computes the current attributes of an open file.
pub trait Probe: Sync {
    fn compute(&self, file: &File) -> Result<ActualAttr, ProbeError>;
}

/// Streaming sha256 with an mtime check on both sides of the read.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Probe {
    buffer_size: usize,
}

impl Sha256Probe {
    pub fn new() -> Self {
        Self::with_buffer_size(HASH_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }
}

impl Default for Sha256Probe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for Sha256Probe {
    fn compute(&self, file: &File) -> Result<ActualAttr, ProbeError> {
        let mut reader = file;
        hash_consistent(&mut reader, self.buffer_size, || {
            file.metadata().map(|m| Timestamp::from_metadata(&m))
        })
    }
}

/// Hash everything `reader` yields, reading the mtime through `mtime` before
/// and after.
///
/// If the two mtimes differ the digest is discarded and
/// [`ProbeError::ConcurrentModification`] is returned.
pub fn hash_consistent<R, F>(
    reader: &mut R,
    buffer_size: usize,
    mut mtime: F,
) -> Result<ActualAttr, ProbeError>
where
    R: Read,
    F: FnMut() -> io::Result<Timestamp>,
{
    let before = mtime()?;
    let digest = hash_stream(reader, buffer_size)?;
    let after = mtime()?;

    if before != after {
        return Err(ProbeError::ConcurrentModification { before, after });
    }

    Ok(ActualAttr {
        timestamp: before,
        digest,
    })
}

fn hash_stream<R: Read>(reader: &mut R, buffer_size: usize) -> io::Result<Digest> {
    let mut buffer = vec![0u8; buffer_size];
    let mut hasher = Sha256::new();

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(Digest::from_bytes(hasher.finalize().into()))
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
