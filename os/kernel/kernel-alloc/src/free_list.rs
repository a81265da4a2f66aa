use core::ptr::{NonNull, null_mut};
use kernel_info::memory::PAGE_SIZE;

/// Link stored in the first word of every **free** page.
///
/// ```text
/// +------------------+----------------------------------+
/// | Run { next }     |   poison bytes (rest of page)    |
/// +------------------+----------------------------------+
/// ^ page address
/// ```
///
/// The page itself is the list node; no metadata lives anywhere else.
#[repr(C)]
struct Run {
    /// Next free page (or null).
    next: *mut Self,
}

/// Intrusive, singly-linked LIFO list of free pages.
///
/// # Invariants
/// - Every node is a distinct, page-aligned, page-sized block owned by the list.
/// - `head` is null exactly when the list is empty.
pub struct FreeList {
    head: *mut Run,
}

// Safety: the list is only ever reached through the pool's lock; raw pointers
// are only dereferenced while it is held.
unsafe impl Send for FreeList {}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: null_mut() }
    }

    /// Link `page` in as the new head.
    ///
    /// # Safety
    /// - `page` must point to a writable, page-aligned page that no one else
    ///   references and that is not already on the list.
    #[allow(clippy::cast_ptr_alignment)]
    pub unsafe fn push(&mut self, page: NonNull<u8>) {
        debug_assert!(page.as_ptr().addr().is_multiple_of(PAGE_SIZE as usize));
        // A page is aligned far beyond `Run`.
        let node = page.cast::<Run>();
        unsafe { node.write(Run { next: self.head }) };
        self.head = node.as_ptr();
    }

    /// Unlink and return the head, if any.
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = NonNull::new(self.head)?;
        // Safety: every node on the list was written by `push`.
        self.head = unsafe { (*node.as_ptr()).next };
        Some(node.cast())
    }

    /// Number of pages on the list (walks it).
    pub const fn len(&self) -> usize {
        let mut n = 0;
        let mut cur = self.head;
        while !cur.is_null() {
            n += 1;
            cur = unsafe { (*cur).next };
        }
        n
    }
}
