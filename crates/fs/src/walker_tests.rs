use super::*;

use crossbeam::channel;
use std::{
    fs::{create_dir, create_dir_all, write},
    os::unix::{fs::symlink, net::UnixListener},
    path::PathBuf,
    sync::atomic::AtomicBool,
};

fn collect(rx: &channel::Receiver<Entry>) -> Vec<Entry> {
    rx.try_iter().collect()
}

fn rel(entries: &[Entry], root: &Path, pick: fn(&Entry) -> bool) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = entries
        .iter()
        .filter(|e| pick(e))
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    out.sort();
    out
}

#[test]
fn walk_parallel_emits_every_regular_file_once() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().to_path_buf();

    // root/
    //   a.txt
    //   sub/
    //     b.txt
    //     deeper/
    //       c.txt
    //   empty/
    write(root.join("a.txt"), b"a").expect("write a.txt");
    create_dir_all(root.join("sub").join("deeper")).expect("create sub/deeper");
    write(root.join("sub").join("b.txt"), b"b").expect("write b.txt");
    write(root.join("sub").join("deeper").join("c.txt"), b"c").expect("write c.txt");
    create_dir(root.join("empty")).expect("create empty");

    let (tx, rx) = channel::unbounded::<Entry>();
    let cancel = AtomicBool::new(false);

    walk_parallel(vec![root.clone()], &tx, &cancel, 4);

    let entries = collect(&rx);
    let files = rel(&entries, &root, |e| matches!(e, Entry::File(_)));
    assert_eq!(
        files,
        vec![
            PathBuf::from("a.txt"),
            PathBuf::from("sub/b.txt"),
            PathBuf::from("sub/deeper/c.txt"),
        ]
    );
    // Directories themselves are never emitted.
    assert_eq!(entries.len(), 3);
}

#[test]
fn walk_parallel_skips_symlinks_and_special_files() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().to_path_buf();

    create_dir(root.join("target")).expect("create target");
    write(root.join("target").join("inside.txt"), b"x").expect("write inside");
    write(root.join("real.txt"), b"r").expect("write real");
    symlink(root.join("real.txt"), root.join("link.txt")).expect("symlink file");
    symlink(root.join("target"), root.join("dirlink")).expect("symlink dir");
    let _sock = UnixListener::bind(root.join("sock")).expect("bind socket");

    let (tx, rx) = channel::unbounded::<Entry>();
    let cancel = AtomicBool::new(false);
    walk_parallel(vec![root.clone()], &tx, &cancel, 2);

    let entries = collect(&rx);
    assert_eq!(
        rel(&entries, &root, |e| matches!(e, Entry::File(_))),
        vec![PathBuf::from("real.txt"), PathBuf::from("target/inside.txt")]
    );
    assert_eq!(
        rel(&entries, &root, |e| matches!(e, Entry::Skipped(_))),
        vec![
            PathBuf::from("dirlink"),
            PathBuf::from("link.txt"),
            PathBuf::from("sock"),
        ]
    );
}

#[test]
fn walk_parallel_reports_unreadable_root() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let missing = tmp.path().join("missing");

    let (tx, rx) = channel::unbounded::<Entry>();
    let cancel = AtomicBool::new(false);
    walk_parallel(vec![missing.clone()], &tx, &cancel, 2);

    let entries = collect(&rx);
    assert_eq!(entries.len(), 1);
    match &entries[0] {
        Entry::Unreadable { path, error } => {
            assert_eq!(path, &missing);
            assert_eq!(error.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected Unreadable, got {other:?}"),
    }
}

#[test]
fn walk_parallel_with_no_roots_emits_nothing() {
    let (tx, rx) = channel::unbounded::<Entry>();
    let cancel = AtomicBool::new(false);

    walk_parallel(Vec::new(), &tx, &cancel, 4);

    drop(tx);
    assert!(rx.recv().is_err());
}

#[test]
fn walk_parallel_stops_when_cancelled() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().to_path_buf();
    for i in 0..20 {
        write(root.join(format!("f{i}")), b"x").expect("write");
    }

    let (tx, rx) = channel::unbounded::<Entry>();
    let cancel = AtomicBool::new(true);
    walk_parallel(vec![root], &tx, &cancel, 4);

    assert!(collect(&rx).is_empty());
}

#[test]
fn walk_parallel_returns_when_receiver_is_gone() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().to_path_buf();
    for i in 0..20 {
        write(root.join(format!("f{i}")), b"x").expect("write");
    }

    let (tx, rx) = channel::bounded::<Entry>(1);
    drop(rx);
    let cancel = AtomicBool::new(false);

    // Must not block on the full or disconnected channel.
    walk_parallel(vec![root], &tx, &cancel, 2);
}

#[test]
fn send_entry_gives_up_on_cancel_while_queue_is_full() {
    let (tx, _rx) = channel::bounded::<Entry>(1);
    let cancel = AtomicBool::new(false);

    assert!(send_entry(&tx, Entry::File(PathBuf::from("a")), &cancel));

    cancel.store(true, Ordering::Relaxed);
    assert!(!send_entry(&tx, Entry::File(PathBuf::from("b")), &cancel));
}
