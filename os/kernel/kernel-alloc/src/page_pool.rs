//! # Physical Page Pool
//!
//! Allocates whole 4096-byte pages for user memory, kernel stacks, page-table
//! pages and I/O buffers.
//!
//! ## Bootstrap
//!
//! Initialization happens in two phases:
//!
//! 1. [`PagePool::init_phase1`] runs while only the boot processor is up and
//!    only a minimal boot mapping exists. It records the [`MemoryLayout`] and
//!    frees just the pages that mapping can reach. The pool lock is in
//!    bootstrap mode: acquiring it never waits.
//! 2. [`PagePool::init_phase2`] runs once a page table mapping all of
//!    physical memory is installed on every core. It frees the remainder and
//!    switches the lock to enforced mutual exclusion for good.
//!
//! ## Poisoning
//!
//! Every freed page is overwritten with [`POISON_BYTE`] before it is linked,
//! so a dangling reference reads recognizable junk.

use crate::free_list::FreeList;
use core::ptr::{NonNull, with_exposed_provenance_mut};
use kernel_info::layout::MemoryLayout;
use kernel_info::memory::{PAGE_SIZE, POISON_BYTE};
use kernel_sync::{BootLock, SyncOnceCell};

const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// Where the pool is in its bootstrap sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Phase 1 has not run; the pool is empty and has no layout.
    Uninitialized,
    /// Phase 1 ran; the lock does not enforce mutual exclusion yet.
    Bootstrap,
    /// Phase 2 ran; every list mutation is serialized.
    Running,
}

/// Pool of free physical pages.
///
/// Constructed `const` in bootstrap mode so it can live in a `static`
/// (see [`KMEM`](crate::KMEM)).
pub struct PagePool {
    layout: SyncOnceCell<MemoryLayout>,
    free: BootLock<FreeList>,
}

impl Default for PagePool {
    fn default() -> Self {
        Self::new()
    }
}

impl PagePool {
    /// An empty pool in bootstrap mode, usable in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layout: SyncOnceCell::new(),
            free: BootLock::new("kmem", FreeList::new()),
        }
    }

    /// Record `layout` and free the pages in `[start, end)`.
    ///
    /// # Safety
    /// - Must run before any other operation on this pool, on a single core,
    ///   with nothing able to preempt it until [`init_phase2`](Self::init_phase2).
    /// - `[start, end)` must be unused, writable memory inside the direct map,
    ///   above the end of the kernel image.
    ///
    /// # Panics
    /// If called twice, or if the range contains a page
    /// [`free_page`](Self::free_page) rejects.
    pub unsafe fn init_phase1(&self, layout: MemoryLayout, start: usize, end: usize) {
        assert!(
            self.layout.set(layout).is_ok(),
            "init_phase1: page pool already initialized"
        );
        let pages = unsafe { self.free_range(start, end) };
        log::debug!("kmem: phase 1 registered {pages} pages in {start:#x}..{end:#x}");
    }

    /// Free the pages in `[start, end)`, then enforce mutual exclusion.
    ///
    /// # Safety
    /// - Every core must already map `[start, end)`.
    /// - `[start, end)` must be unused, writable memory not handed out by
    ///   phase 1.
    ///
    /// # Panics
    /// If phase 1 has not run or phase 2 already ran.
    pub unsafe fn init_phase2(&self, start: usize, end: usize) {
        assert!(
            self.phase() == Phase::Bootstrap,
            "init_phase2: expected bootstrap phase, pool is {:?}",
            self.phase()
        );
        let pages = unsafe { self.free_range(start, end) };
        self.free.enforce();
        log::info!(
            "kmem: phase 2 registered {pages} pages, {} free, locking enabled",
            self.free_page_count()
        );
    }

    /// Free every whole page in `[start, end)`, rounding `start` up to a page
    /// boundary. Returns the number of pages freed.
    ///
    /// # Safety
    /// Same requirements as [`free_page`](Self::free_page) for every page in
    /// the range.
    ///
    /// # Panics
    /// If the pool is uninitialized or the range holds a page
    /// [`free_page`](Self::free_page) rejects.
    pub unsafe fn free_range(&self, start: usize, end: usize) -> usize {
        let mut p = start.next_multiple_of(PAGE_BYTES);
        let mut pages = 0;
        while let Some(next) = p.checked_add(PAGE_BYTES)
            && next <= end
        {
            let Some(page) = NonNull::new(with_exposed_provenance_mut::<u8>(p)) else {
                panic!("free_range: null page");
            };
            unsafe { self.free_page(page) };
            pages += 1;
            p = next;
        }
        pages
    }

    /// Take one page off the free list.
    ///
    /// Returns `None` when the pool is exhausted; never waits for memory.
    /// The contents are whatever the page held (poison for a page that was
    /// freed, unless it was just registered); callers zero it if they need to.
    #[must_use]
    pub fn alloc_page(&self) -> Option<NonNull<u8>> {
        self.free.lock().pop()
    }

    /// Return `page` to the pool.
    ///
    /// # Safety
    /// `page` must have been returned by [`alloc_page`](Self::alloc_page) (or
    /// be part of a range handed to an init phase) and must not be used
    /// afterwards.
    ///
    /// # Panics
    /// If the pool is uninitialized, or `page` is not page-aligned, lies below
    /// the end of the kernel image, or lies at/above the top of physical
    /// memory. These are kernel bugs; the check precedes any write.
    pub unsafe fn free_page(&self, page: NonNull<u8>) {
        let Some(layout) = self.layout.get() else {
            panic!("free_page: page pool not initialized");
        };
        let addr = page.as_ptr().addr();
        if !addr.is_multiple_of(PAGE_BYTES)
            || addr < layout.kernel_end()
            || !layout.in_direct_map(addr)
        {
            panic!("free_page: invalid page {addr:#x}");
        }

        // Fill with junk to catch dangling refs.
        unsafe { page.as_ptr().write_bytes(POISON_BYTE, PAGE_BYTES) };

        let mut free = self.free.lock();
        unsafe { free.push(page) };
    }

    /// Number of free pages (walks the list under the lock).
    #[must_use]
    pub fn free_page_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Layout recorded by phase 1.
    ///
    /// # Panics
    /// If phase 1 has not run.
    #[must_use]
    pub fn layout(&self) -> &MemoryLayout {
        let Some(layout) = self.layout.get() else {
            panic!("layout: page pool not initialized");
        };
        layout
    }

    /// Current bootstrap [`Phase`], derived from the recorded layout and the
    /// lock mode.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.layout.get().is_none() {
            Phase::Uninitialized
        } else if self.free.is_enforced() {
            Phase::Running
        } else {
            Phase::Bootstrap
        }
    }

    /// Whether list mutations currently take the lock for real.
    #[must_use]
    pub fn is_locking(&self) -> bool {
        self.free.is_enforced()
    }
}
