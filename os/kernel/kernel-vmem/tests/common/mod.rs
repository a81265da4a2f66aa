#![allow(dead_code)]

use kernel_alloc::PagePool;
use kernel_info::layout::MemoryLayout;
use kernel_info::memory::{EXTMEM, PAGE_SIZE};
use kernel_memory_addresses::PhysicalAddress;
use std::alloc::{Layout, alloc_zeroed, dealloc};

pub const PAGE: usize = PAGE_SIZE as usize;

/// Page-aligned heap block standing in for physical memory `[0, size)`,
/// with a fake kernel image right above the first MiB.
pub struct Arena {
    ptr: *mut u8,
    size: usize,
    layout: MemoryLayout,
}

impl Arena {
    pub fn new(size: usize) -> Self {
        let alloc_layout = Layout::from_size_align(size, PAGE).unwrap();
        let ptr = unsafe { alloc_zeroed(alloc_layout) };
        assert!(!ptr.is_null());
        let base = ptr.expose_provenance();
        let text_end = base + EXTMEM as usize + 2 * PAGE;
        let end = text_end + 2 * PAGE;
        let phys_top = PhysicalAddress::new(u32::try_from(size).unwrap());
        let layout = MemoryLayout::new(base, text_end, end, phys_top);
        Self { ptr, size, layout }
    }

    pub const fn layout(&self) -> MemoryLayout {
        self.layout
    }

    /// A fully initialized pool over everything above the fake image.
    pub fn pool(&self) -> PagePool {
        let pool = PagePool::new();
        let end = self.layout.kernel_end();
        let top = self.layout.direct_map_base() + self.size;
        unsafe {
            pool.init_phase1(self.layout, end, end + 8 * PAGE);
            pool.init_phase2(end + 8 * PAGE, top);
        }
        pool
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let alloc_layout = Layout::from_size_align(self.size, PAGE).unwrap();
        unsafe { dealloc(self.ptr, alloc_layout) };
    }
}

/// Take pages out of `pool` until only `keep` remain. Returns them for later
/// release.
pub fn drain_to(pool: &PagePool, keep: usize) -> Vec<std::ptr::NonNull<u8>> {
    let mut taken = Vec::new();
    while pool.free_page_count() > keep {
        taken.push(pool.alloc_page().unwrap());
    }
    taken
}
