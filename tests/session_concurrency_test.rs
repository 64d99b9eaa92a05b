//! Integration test: concurrent writers against one shared session
//!
//! Verifies version accounting, token totals and compare-and-swap retries
//! when many threads mutate the same history.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;

use vega::internal::session::{Content, HistoryChange, MAX_MESSAGES, Session};

/// Test: parallel appends are all counted and the window stays bounded
#[test]
fn test_parallel_appends() {
    const THREADS: usize = 10;
    const PER_THREAD: usize = 50;

    let session = Arc::new(Session::new("/work"));
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    session.set_observer(Arc::new(move |_: HistoryChange| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    session.add_content_with_tokens(Content::user(format!("t{t} m{i}")), 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let total = (THREADS * PER_THREAD) as u64;
    assert_eq!(session.version(), total);
    assert_eq!(session.len(), MAX_MESSAGES);
    assert_eq!(session.total_tokens(), MAX_MESSAGES as u64);
    assert_eq!(session.token_counts().iter().sum::<u64>(), session.total_tokens());
    assert_eq!(notified.load(Ordering::SeqCst), THREADS * PER_THREAD);
}

/// Test: read-modify-write loops converge without losing updates
#[test]
fn test_compare_and_swap_retries() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 20;

    let session = Arc::new(Session::new("/work"));
    let conflicts = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let session = Arc::clone(&session);
            let conflicts = Arc::clone(&conflicts);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    loop {
                        let (mut history, version) = session.history_with_version();
                        history.push(Content::model(format!("t{t} r{i}")));
                        if session.set_history_if_version(history, version) {
                            break;
                        }
                        conflicts.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(session.len(), THREADS * PER_THREAD);
    assert_eq!(session.version(), (THREADS * PER_THREAD) as u64);
    for t in 0..THREADS {
        let mine: Vec<String> = session
            .history()
            .iter()
            .map(Content::text)
            .filter(|text| text.starts_with(&format!("t{t} ")))
            .collect();
        let expected: Vec<String> = (0..PER_THREAD).map(|i| format!("t{t} r{i}")).collect();
        assert_eq!(mine, expected);
    }
}

/// Test: readers always see a history consistent with its version
#[test]
fn test_readers_during_writes() {
    let session = Arc::new(Session::new("/work"));
    let writer = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            for i in 0..80 {
                session.add_user_message(format!("{i}"));
            }
        })
    };
    let reader = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            for _ in 0..200 {
                let (history, version) = session.history_with_version();
                // Below the trim threshold every append adds exactly one entry.
                assert_eq!(history.len() as u64, version);
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
}
