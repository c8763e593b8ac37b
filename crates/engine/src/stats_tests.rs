use super::*;
use std::{sync::Arc, thread};

fn snapshot_of(outcomes: &[Outcome]) -> StatsSnapshot {
    let stats = Stats::new();
    for &o in outcomes {
        stats.record(o);
    }
    stats.snapshot()
}

#[test]
fn record_increments_exactly_one_counter() {
    for outcome in Outcome::ALL {
        let snap = snapshot_of(&[outcome]);
        assert_eq!(snap.total(), 1, "{outcome:?}");
        assert_eq!(snap.count(outcome), 1, "{outcome:?}");
    }
}

#[test]
fn exit_code_cases() {
    use Outcome::*;

    let cases: &[(&[Outcome], u8)] = &[
        (&[], EXIT_OK),
        (&[Ok, Outdated, TimeChange, New, Removed], EXIT_OK),
        (&[Ok, OpenError, OpenError], EXIT_OPEN_ERRORS),
        (&[NotRegular, New], EXIT_NOT_REGULAR),
        (&[WriteError, Ok], EXIT_WRITE_ERRORS),
        (&[Corrupt], EXIT_CORRUPT),
        // corruption takes priority over any error mix
        (&[Corrupt, OpenError, WriteError, NotRegular], EXIT_CORRUPT),
        (&[OpenError, WriteError], EXIT_OTHER),
        (&[NotRegular, OpenError], EXIT_OTHER),
        (&[ReadError], EXIT_OTHER),
        (&[RemoveError, Removed], EXIT_OTHER),
        // a race is not an error, but the file is not clean either
        (&[Ok, ConcurrentModification], EXIT_OTHER),
    ];

    for (outcomes, expected) in cases {
        let snap = snapshot_of(outcomes);
        assert_eq!(exit_code(&snap), *expected, "outcomes {outcomes:?}");
        assert_eq!(snap.exit_code(), *expected);
    }
}

#[test]
fn errors_and_clean_partition_the_error_and_success_outcomes() {
    let snap = snapshot_of(&Outcome::ALL);

    assert_eq!(snap.errors(), 5);
    assert_eq!(snap.errors_other(), 2);
    assert_eq!(snap.clean(), 5);
    assert_eq!(
        snap.total(),
        snap.errors() + snap.clean() + snap.corrupt + snap.concurrent_modification
    );

    for o in Outcome::ALL {
        let is_error_counter = snapshot_of(&[o]).errors() == 1;
        assert_eq!(o.is_error(), is_error_counter, "{o:?}");
    }
}

#[test]
fn concurrent_increments_are_not_lost() {
    let stats = Arc::new(Stats::new());
    let threads = 8;
    let per_thread = 1000;

    thread::scope(|s| {
        for i in 0..threads {
            let stats = Arc::clone(&stats);
            s.spawn(move || {
                let outcome = if i % 2 == 0 { Outcome::Ok } else { Outcome::New };
                for _ in 0..per_thread {
                    stats.record(outcome);
                }
            });
        }
    });

    let snap = stats.snapshot();
    assert_eq!(snap.ok, 4 * per_thread);
    assert_eq!(snap.new, 4 * per_thread);
    assert_eq!(snap.total(), threads * per_thread);
}
