use super::*;
use crate::{
    attr::Digest,
    store::MemoryStore,
    timestamp::{Timestamp, TimestampResolution},
};
use std::{
    fs,
    io::Write,
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;

const HELLO_WORLD_SHA256: &str =
    "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

fn options() -> CheckOptions {
    CheckOptions {
        resolution: TimestampResolution::Fine,
        ..CheckOptions::default()
    }
}

fn memory_checker(options: CheckOptions) -> Checker<MemoryStore, Sha256Probe> {
    Checker::with_parts(MemoryStore::new(), Sha256Probe::new(), options)
}

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).expect("create file");
    f.write_all(content).expect("write file");
    path
}

fn mtime_of(path: &Path) -> Timestamp {
    Timestamp::from_metadata(&fs::metadata(path).expect("metadata"))
}

fn stored_of<S: AttrStore>(store: &S, path: &Path) -> StoredAttr {
    let file = File::open(path).expect("open");
    let digest = store.get(&file, XATTR_SHA256).expect("get digest");
    let ts = store.get(&file, XATTR_TS).expect("get ts");
    decode_stored(digest.as_deref(), ts.as_deref())
}

fn put_raw<S: AttrStore>(store: &S, path: &Path, name: &str, value: &[u8]) {
    let file = File::open(path).expect("open");
    store.set(&file, name, value).expect("set");
}

fn other_digest() -> Digest {
    Digest::from_bytes([0x11; 32])
}

#[test]
fn new_file_gets_both_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    let report = checker.check(&path);

    assert_eq!(report.outcome, Outcome::New);
    assert_eq!(report.decision, Some(Decision::New));
    assert!(report.updated);
    assert!(report.error.is_none());

    let stored = stored_of(checker.store(), &path);
    assert_eq!(stored.digest.map(|d| d.to_hex()).as_deref(), Some(HELLO_WORLD_SHA256));
    assert_eq!(stored.timestamp, Some(mtime_of(&path)));
    assert_eq!(checker.store().write_count(), 2);
}

#[test]
fn second_check_of_unmodified_file_is_ok_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    assert_eq!(checker.check(&path).outcome, Outcome::New);
    let writes_after_first = checker.store().write_count();

    let second = checker.check(&path);
    assert_eq!(second.outcome, Outcome::Ok);
    assert!(!second.updated);

    let third = checker.check(&path);
    assert_eq!(third.outcome, Outcome::Ok);
    assert_eq!(checker.store().write_count(), writes_after_first);
}

#[test]
fn corruption_keeps_stored_digest_without_fix() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    put_raw(checker.store(), &path, XATTR_TS, mtime_of(&path).to_string().as_bytes());
    put_raw(checker.store(), &path, XATTR_SHA256, other_digest().to_hex().as_bytes());
    let writes_before = checker.store().write_count();

    let report = checker.check(&path);

    assert_eq!(report.outcome, Outcome::Corrupt);
    assert!(!report.updated);
    assert!(!report.fix_requested);
    assert_eq!(stored_of(checker.store(), &path).digest, Some(other_digest()));
    assert_eq!(checker.store().write_count(), writes_before);

    let cmp = report.comparison.expect("comparison");
    assert_eq!(cmp.stored.digest, Some(other_digest()));
    assert_eq!(cmp.actual.digest.to_hex(), HELLO_WORLD_SHA256);
}

#[test]
fn corruption_with_fix_replaces_stored_digest() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(CheckOptions {
        force_fix: true,
        ..options()
    });

    put_raw(checker.store(), &path, XATTR_TS, mtime_of(&path).to_string().as_bytes());
    put_raw(checker.store(), &path, XATTR_SHA256, other_digest().to_hex().as_bytes());

    let report = checker.check(&path);

    assert_eq!(report.outcome, Outcome::Corrupt);
    assert!(report.updated);
    assert!(report.fix_requested);
    let stored = stored_of(checker.store(), &path);
    assert_eq!(stored.digest.map(|d| d.to_hex()).as_deref(), Some(HELLO_WORLD_SHA256));

    // Once fixed, the next run is clean.
    assert_eq!(checker.check(&path).outcome, Outcome::Ok);
}

#[test]
fn timestamp_only_change_is_timechange_and_reanchors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    put_raw(checker.store(), &path, XATTR_TS, b"0000000001.000000000");
    put_raw(checker.store(), &path, XATTR_SHA256, HELLO_WORLD_SHA256.as_bytes());

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::TimeChange);
    assert!(report.updated);
    assert_eq!(stored_of(checker.store(), &path).timestamp, Some(mtime_of(&path)));
}

#[test]
fn content_and_time_change_is_outdated() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    put_raw(checker.store(), &path, XATTR_TS, b"0000000001.000000000");
    put_raw(checker.store(), &path, XATTR_SHA256, other_digest().to_hex().as_bytes());

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::Outdated);
    assert!(report.updated);
    let stored = stored_of(checker.store(), &path);
    assert_eq!(stored.digest.map(|d| d.to_hex()).as_deref(), Some(HELLO_WORLD_SHA256));
}

#[test]
fn matching_timestamp_without_digest_is_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    // An earlier run stored the timestamp and then failed on the digest.
    put_raw(checker.store(), &path, XATTR_TS, mtime_of(&path).to_string().as_bytes());

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::New);
    assert!(report.updated);
    assert!(stored_of(checker.store(), &path).digest.is_some());
}

#[test]
fn garbage_digest_is_treated_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    put_raw(checker.store(), &path, XATTR_TS, mtime_of(&path).to_string().as_bytes());
    put_raw(checker.store(), &path, XATTR_SHA256, b"not hex at all");

    // Never a false corrupt.
    assert_eq!(checker.check(&path).outcome, Outcome::New);
}

#[test]
fn dry_run_classifies_but_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(CheckOptions {
        dry_run: true,
        ..options()
    });

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::New);
    assert!(!report.updated);
    assert_eq!(checker.store().write_count(), 0);
    assert_eq!(stored_of(checker.store(), &path), StoredAttr::default());
}

/// Probe that always sees the mtime move.
struct RacingProbe {
    calls: AtomicUsize,
}

impl Probe for RacingProbe {
    fn compute(&self, _file: &File) -> Result<ActualAttr, ProbeError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(ProbeError::ConcurrentModification {
            before: Timestamp::new(10, 0),
            after: Timestamp::new(11, 0),
        })
    }
}

#[test]
fn concurrent_modification_skips_classification_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = Checker::with_parts(
        MemoryStore::new(),
        RacingProbe {
            calls: AtomicUsize::new(0),
        },
        CheckOptions {
            force_fix: true,
            ..options()
        },
    );

    let report = checker.check(&path);

    assert_eq!(report.outcome, Outcome::ConcurrentModification);
    assert_eq!(report.decision, None);
    assert!(report.comparison.is_none());
    assert!(!report.updated);
    assert_eq!(checker.store().write_count(), 0);
}

#[test]
fn missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let checker = memory_checker(options());

    let report = checker.check(&dir.path().join("nope"));
    assert_eq!(report.outcome, Outcome::OpenError);
    assert!(report.error.is_some());
    assert!(report.decision.is_none());
}

#[test]
fn directory_is_not_regular() {
    let dir = tempfile::tempdir().unwrap();
    let checker = memory_checker(options());

    let report = checker.check(dir.path());
    assert_eq!(report.outcome, Outcome::NotRegular);
    assert!(
        report.error.as_deref().unwrap_or_default().contains("not a regular file"),
        "got {:?}",
        report.error
    );
}

/// Store whose writes and removals fail on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_set: bool,
    fail_remove_ts: bool,
    fail_remove_digest: bool,
}

impl AttrStore for FlakyStore {
    fn get(&self, file: &File, name: &str) -> io::Result<Option<Vec<u8>>> {
        self.inner.get(file, name)
    }

    fn set(&self, file: &File, name: &str, value: &[u8]) -> io::Result<()> {
        if self.fail_set {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.inner.set(file, name, value)
    }

    fn remove(&self, file: &File, name: &str) -> io::Result<bool> {
        let fail = match name {
            XATTR_TS => self.fail_remove_ts,
            _ => self.fail_remove_digest,
        };
        if fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, name));
        }
        self.inner.remove(file, name)
    }
}

#[test]
fn write_failure_reports_write_error_with_detected_decision() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = Checker::with_parts(
        FlakyStore {
            fail_set: true,
            ..FlakyStore::default()
        },
        Sha256Probe::new(),
        options(),
    );

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::WriteError);
    assert_eq!(report.decision, Some(Decision::New));
    assert!(!report.updated);
    assert!(report.error.as_deref().unwrap_or_default().contains("read-only"));
}

#[test]
fn failed_fix_still_reports_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let store = FlakyStore::default();
    put_raw(&store.inner, &path, XATTR_TS, mtime_of(&path).to_string().as_bytes());
    put_raw(&store.inner, &path, XATTR_SHA256, other_digest().to_hex().as_bytes());

    let checker = Checker::with_parts(
        FlakyStore {
            fail_set: true,
            ..store
        },
        Sha256Probe::new(),
        CheckOptions {
            force_fix: true,
            ..options()
        },
    );

    let report = checker.check(&path);
    assert_eq!(report.outcome, Outcome::Corrupt);
    assert!(report.error.is_some());
    assert_eq!(stored_of(checker.store(), &path).digest, Some(other_digest()));
}

#[test]
fn remove_deletes_both_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    assert_eq!(checker.check(&path).outcome, Outcome::New);
    assert_eq!(checker.remove(&path).outcome, Outcome::Removed);
    assert_eq!(stored_of(checker.store(), &path), StoredAttr::default());

    // Nothing left to remove is still a success.
    assert_eq!(checker.remove(&path).outcome, Outcome::Removed);
}

#[test]
fn remove_in_dry_run_keeps_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let store = MemoryStore::new();
    put_raw(&store, &path, XATTR_SHA256, HELLO_WORLD_SHA256.as_bytes());

    let checker = Checker::with_parts(
        store,
        Sha256Probe::new(),
        CheckOptions {
            dry_run: true,
            ..options()
        },
    );

    assert_eq!(checker.remove(&path).outcome, Outcome::Removed);
    assert!(stored_of(checker.store(), &path).digest.is_some());
}

#[test]
fn removal_failures_are_reported_per_attribute() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let file = File::open(&path).unwrap();

    let only_ts = FlakyStore {
        fail_remove_ts: true,
        ..FlakyStore::default()
    };
    let err = remove_attrs(&only_ts, &file).expect_err("ts removal fails");
    assert!(err.timestamp.is_some());
    assert!(err.digest.is_none());
    assert!(!err.both_failed());

    let both = FlakyStore {
        fail_remove_ts: true,
        fail_remove_digest: true,
        ..FlakyStore::default()
    };
    let err = remove_attrs(&both, &file).expect_err("both fail");
    assert!(err.both_failed());

    let checker = Checker::with_parts(both, Sha256Probe::new(), options());
    let report = checker.remove(&path);
    assert_eq!(report.outcome, Outcome::RemoveError);
    let msg = report.error.expect("error message");
    assert!(msg.contains("removing timestamp"), "{msg}");
    assert!(msg.contains("removing digest"), "{msg}");
}

#[test]
fn stages_expose_intermediate_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "a.txt", b"hello world");
    let checker = memory_checker(options());

    let opened = CheckPipeline::open(&checker, &path).ok().expect("open");
    let read = opened.read_stored();
    assert_eq!(read.stored(), &StoredAttr::default());

    let computed = read.compute_actual().ok().expect("hash");
    assert_eq!(computed.actual().digest.to_hex(), HELLO_WORLD_SHA256);

    let classified = computed.classify();
    assert_eq!(classified.decision(), Decision::New);

    let applied = classified.apply();
    assert!(matches!(applied.write_result(), WriteResult::Updated));

    let report = applied.report();
    assert!(report.metrics.hash_time.is_some());
    assert!(report.metrics.write_time.is_some());
}
