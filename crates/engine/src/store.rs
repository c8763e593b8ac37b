use std::{
    collections::HashMap,
    fs::File,
    io,
    os::unix::fs::MetadataExt,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use xattr::FileExt;

/// Named byte blobs attached to an open file.
///
/// Implementations must be usable from many worker threads at once.
pub trait AttrStore: Sync {
    /// `Ok(None)` when the attribute is not set.
    fn get(&self, file: &File, name: &str) -> io::Result<Option<Vec<u8>>>;

    fn set(&self, file: &File, name: &str, value: &[u8]) -> io::Result<()>;

    /// Returns whether the attribute existed. Removing an absent attribute is
    /// not an error.
    fn remove(&self, file: &File, name: &str) -> io::Result<bool>;
}

/// Filesystem extended attributes via `fgetxattr(2)` and friends.
#[derive(Debug, Default, Clone, Copy)]
pub struct XattrStore;

impl AttrStore for XattrStore {
    fn get(&self, file: &File, name: &str) -> io::Result<Option<Vec<u8>>> {
        file.get_xattr(name)
    }

    fn set(&self, file: &File, name: &str, value: &[u8]) -> io::Result<()> {
        // On SMB mounts the macOS client turns an overwrite into a removal,
        // so clear the old value first.
        #[cfg(target_os = "macos")]
        {
            let _ = self.remove(file, name);
        }

        file.set_xattr(name, value)
    }

    fn remove(&self, file: &File, name: &str) -> io::Result<bool> {
        match file.remove_xattr(name) {
            Ok(()) => Ok(true),
            Err(e) if is_missing_attr(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// errno for "no such attribute". Linux reuses ENODATA.
#[cfg(any(target_os = "linux", target_os = "android"))]
const ENOATTR: i32 = libc::ENODATA;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const ENOATTR: i32 = libc::ENOATTR;

fn is_missing_attr(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ENOATTR)
}

/// Process-local attribute store keyed by (device, inode).
///
/// Lets the pipeline run on filesystems without user xattrs, which is mostly
/// useful in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attrs: Mutex<HashMap<(u64, u64), HashMap<String, Vec<u8>>>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn key(file: &File) -> io::Result<(u64, u64)> {
        let meta = file.metadata()?;
        Ok((meta.dev(), meta.ino()))
    }
}

impl AttrStore for MemoryStore {
    fn get(&self, file: &File, name: &str) -> io::Result<Option<Vec<u8>>> {
        let key = Self::key(file)?;
        let attrs = self.attrs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(attrs.get(&key).and_then(|m| m.get(name)).cloned())
    }

    fn set(&self, file: &File, name: &str, value: &[u8]) -> io::Result<()> {
        let key = Self::key(file)?;
        self.attrs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .insert(name.to_owned(), value.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove(&self, file: &File, name: &str) -> io::Result<bool> {
        let key = Self::key(file)?;
        let mut attrs = self.attrs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(attrs
            .get_mut(&key)
            .and_then(|m| m.remove(name))
            .is_some())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
