//! Concurrent transactional behavior: atomicity, convergence, isolation

use atomref::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_multi_ref_updates_are_atomic() {
    let dom = Domain::new();
    let a = dom.alloc(0i64);
    let b = dom.alloc(0i64);

    let writer = {
        let dom = dom.clone();
        let a = a.clone();
        let b = b.clone();
        thread::spawn(move || {
            for i in 1..=500i64 {
                let out: Result<()> = dom.run(|| {
                    a.write(i)?;
                    b.write(i)
                });
                out.unwrap();
            }
        })
    };

    let reader = {
        let dom = dom.clone();
        let a = a.clone();
        let b = b.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                let pair: Result<(i64, i64)> = dom.run(|| Ok((a.read()?, b.read()?)));
                let (x, y) = pair.unwrap();
                assert_eq!(x, y, "reader must never observe a torn update");
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!((a.read().unwrap(), b.read().unwrap()), (500, 500));
}

#[test]
fn test_concurrent_commutes_all_land() {
    let dom = Domain::new();
    let counter = dom.alloc(0i64);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let dom = dom.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let out: Result<i64> = dom.run(|| counter.commute(|n| n + 1));
                    out.unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(counter.read().unwrap(), 2000, "both increment streams must survive");
    assert_eq!(counter.version().unwrap(), 2000);
}

#[test]
fn test_concurrent_read_modify_write_loses_nothing() {
    let dom = Domain::new();
    let counter = dom.alloc(0i64);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dom = dom.clone();
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    let out: Result<()> = dom.run(|| {
                        let n = counter.read()?;
                        counter.write(n + 1)
                    });
                    out.unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(
        counter.read().unwrap(),
        1000,
        "write-set validation must prevent lost updates even read-committed"
    );
}

#[test]
fn test_serializable_detects_read_interference() {
    let dom = Domain::new();
    let watched = dom.alloc(0i64);
    let target = dom.alloc(0i64);
    let attempts = AtomicU64::new(0);

    let out: Result<i64> = dom.run_isolated(Isolation::Serializable, || {
        let n = attempts.fetch_add(1, Ordering::Relaxed);
        let seen = watched.read()?;
        if n == 0 {
            // Interfere with the read set from another thread during the
            // first attempt only.
            let dom = dom.clone();
            let watched = watched.clone();
            thread::spawn(move || {
                let out: Result<()> = dom.run(|| watched.write(99));
                out.unwrap();
            })
            .join()
            .unwrap();
        }
        target.write(seen + 1)?;
        Ok(seen + 1)
    });

    assert_eq!(attempts.load(Ordering::Relaxed), 2, "stale read must force a retry");
    assert_eq!(out.unwrap(), 100, "the retry sees the interfering write");
}

#[test]
fn test_read_committed_tolerates_read_interference() {
    let dom = Domain::new();
    let watched = dom.alloc(0i64);
    let target = dom.alloc(0i64);
    let attempts = AtomicU64::new(0);

    let out: Result<i64> = dom.run(|| {
        let n = attempts.fetch_add(1, Ordering::Relaxed);
        let seen = watched.read()?;
        if n == 0 {
            let dom = dom.clone();
            let watched = watched.clone();
            thread::spawn(move || {
                let out: Result<()> = dom.run(|| watched.write(99));
                out.unwrap();
            })
            .join()
            .unwrap();
        }
        target.write(seen + 1)?;
        Ok(seen + 1)
    });

    assert_eq!(
        attempts.load(Ordering::Relaxed),
        1,
        "read-committed must not validate the read set"
    );
    assert_eq!(out.unwrap(), 1);
}

#[test]
fn test_every_writer_terminates_under_contention() {
    let dom = Domain::new();
    let shared = dom.alloc(0i64);
    let done = Arc::new(AtomicU64::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dom = dom.clone();
            let shared = shared.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for _ in 0..100 {
                    let out: Result<()> = dom.run(|| {
                        let n = shared.read()?;
                        shared.write(n + 1)
                    });
                    out.unwrap();
                }
                done.fetch_add(1, Ordering::Relaxed);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(done.load(Ordering::Relaxed), 8, "no writer may be starved forever");
    assert_eq!(shared.read().unwrap(), 800);
}

#[test]
fn test_transactions_are_thread_local() {
    let dom = Domain::new();
    let r = dom.alloc(0i64);

    let out: Result<()> = dom.run(|| {
        r.write(1)?;
        // Another thread must not see this thread's open transaction.
        let dom = dom.clone();
        let r = r.clone();
        let observed = thread::spawn(move || {
            assert!(dom.active_txn_id().is_err());
            r.read().unwrap()
        })
        .join()
        .unwrap();
        assert_eq!(observed, 0, "uncommitted writes are invisible to other threads");
        Ok(())
    });
    out.unwrap();
    assert_eq!(r.read().unwrap(), 1);
}

#[test]
fn test_allocation_during_contention_is_safe() {
    let dom = Domain::new();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dom = dom.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let r = dom.alloc(i as i64);
                    let out: Result<i64> = dom.run(|| r.commute(|n| n + 1));
                    assert_eq!(out.unwrap(), i as i64 + 1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(dom.ref_count(), 200);
}
