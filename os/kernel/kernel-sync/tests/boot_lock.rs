use kernel_sync::BootLock;
use std::{panic, thread};

#[test]
fn bootstrap_lock_and_raii() {
    let l = BootLock::new("test", 0_u32);
    assert!(!l.is_enforced());

    // take the lock, mutate, and drop
    {
        let mut g = l.lock();
        assert!(l.is_locked());
        *g = 41;
    }
    assert!(!l.is_locked());

    // lock again; previous drop must have unlocked
    {
        let mut g = l.lock();
        *g += 1;
        assert_eq!(*g, 42);
    }
}

#[test]
#[should_panic(expected = "kmem: lock re-entered during bootstrap")]
fn bootstrap_reentry_panics() {
    let l = BootLock::new("kmem", ());
    let _g1 = l.lock();
    let _g2 = l.lock();
}

#[test]
fn try_lock_semantics_in_both_modes() {
    let l = BootLock::new("test", 1u8);

    let g1 = l.try_lock();
    assert!(g1.is_some());
    assert!(l.try_lock().is_none());
    drop(g1);

    l.enforce();
    let g2 = l.try_lock();
    assert!(g2.is_some());
    assert!(l.try_lock().is_none());
    drop(g2);
    assert!(l.try_lock().is_some());
}

#[test]
fn enforce_is_idempotent_and_sticky() {
    let l = BootLock::new("test", 0u8);
    l.enforce();
    l.enforce();
    assert!(l.is_enforced());
    assert_eq!(l.with_lock(|v| *v), 0);
    assert!(l.is_enforced());
}

#[test]
fn get_mut_allows_direct_mutation() {
    let mut l = BootLock::new("test", vec![1, 2, 3]);
    l.get_mut().push(4);
    assert_eq!(l.lock().as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    let threads = 8;
    let iters = 5_000;

    let lock = Arc::new(BootLock::new("counter", 0usize));
    // single-threaded setup, then switch on mutual exclusion before sharing
    lock.with_lock(|v| *v = 0);
    lock.enforce();

    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let lock = Arc::clone(&lock);
        let in_cs = Arc::clone(&in_cs);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..iters {
                lock.with_lock(|v| {
                    let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(prev, 0, "mutual exclusion violated");
                    *v += 1;
                    in_cs.fetch_sub(1, Ordering::SeqCst);
                });
                thread::yield_now();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(|v| *v), threads * iters);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
}

#[test]
fn lock_is_released_on_panic() {
    let l = BootLock::new("test", 0u32);
    l.enforce();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            *v = 123;
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");

    assert_eq!(l.with_lock(|v| *v), 123);
}

#[test]
fn bootlock_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let l = BootLock::new("test", 0u8);
    takes_sync(&l);
}

#[test]
fn debug_shows_mode() {
    let l = BootLock::new("kmem", 0u8);
    let s = format!("{l:?}");
    assert!(s.contains("kmem"));
    assert!(s.contains("enforced: false"));
}
