use core::{
    cell::UnsafeCell,
    fmt,
    hint::spin_loop,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A spin lock whose mutual exclusion is switched on once bootstrap ends.
///
/// While only the boot processor runs (and nothing can preempt it), taking a
/// real lock is unnecessary. In that window [`lock`](Self::lock) does not
/// wait: it marks the lock held and panics if it already was, since that can
/// only mean re-entrant use. After [`enforce`](Self::enforce) every
/// acquisition spins until the lock is free.
///
/// The held flag is tracked in both modes, so a guard taken during
/// bootstrap is still respected by the first enforced acquisition.
///
/// # Example
/// ```rust
/// use kernel_sync::BootLock;
///
/// static COUNTER: BootLock<u32> = BootLock::new("counter", 0);
///
/// *COUNTER.lock() += 1; // bootstrap: no waiting
/// COUNTER.enforce();
/// *COUNTER.lock() += 1; // enforced: spins while contended
/// assert_eq!(*COUNTER.lock(), 2);
/// ```
pub struct BootLock<T> {
    name: &'static str,
    /// * `false`: bootstrap, acquisition never waits
    /// * `true`: mutual exclusion enforced
    enforced: AtomicBool,
    /// * `false`: unlocked
    /// * `true`: locked
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

// Safety: every access to `inner` goes through a guard, and at most one guard
// exists at a time in either mode; only T: Send may cross threads.
unsafe impl<T: Send> Sync for BootLock<T> {}

impl<T> BootLock<T> {
    /// Create a lock in bootstrap mode.
    pub const fn new(name: &'static str, inner: T) -> Self {
        Self {
            name,
            enforced: AtomicBool::new(false),
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(inner),
        }
    }

    /// Diagnostic name given at construction.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Switch to enforced mutual exclusion. Idempotent.
    #[inline]
    pub fn enforce(&self) {
        self.enforced.store(true, Ordering::Release);
    }

    /// Whether [`enforce`](Self::enforce) has been called.
    #[inline]
    pub fn is_enforced(&self) -> bool {
        self.enforced.load(Ordering::Acquire)
    }

    /// Whether some guard currently holds the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Acquire the lock.
    ///
    /// # Panics
    /// In bootstrap mode, if the lock is already held.
    #[inline]
    pub fn lock(&self) -> BootLockGuard<'_, T> {
        if self.is_enforced() {
            self.spin_acquire();
        } else if !self.try_acquire() {
            panic!("{}: lock re-entered during bootstrap", self.name);
        }
        BootLockGuard { lock: self }
    }

    /// Try once; returns immediately in either mode.
    #[inline]
    pub fn try_lock(&self) -> Option<BootLockGuard<'_, T>> {
        self.try_acquire().then_some(BootLockGuard { lock: self })
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut g = self.lock();
        f(&mut g)
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Test-and-test-and-set: spin on a plain read, then retry the CAS.
    #[inline]
    fn spin_acquire(&self) {
        while !self.try_acquire() {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
        }
    }
}

impl<T> fmt::Debug for BootLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootLock")
            .field("name", &self.name)
            .field("enforced", &self.is_enforced())
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

pub struct BootLockGuard<'a, T> {
    lock: &'a BootLock<T>,
}

impl<T> Deref for BootLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<T> DerefMut for BootLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<T> Drop for BootLockGuard<'_, T> {
    fn drop(&mut self) {
        // Release publishes the critical section.
        self.lock.locked.store(false, Ordering::Release);
    }
}
