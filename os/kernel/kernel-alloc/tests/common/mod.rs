#![allow(dead_code)]

use kernel_info::layout::MemoryLayout;
use kernel_info::memory::{EXTMEM, PAGE_SIZE};
use kernel_memory_addresses::PhysicalAddress;
use std::alloc::{Layout, alloc_zeroed, dealloc};

pub const PAGE: usize = PAGE_SIZE as usize;

/// Page-aligned heap block standing in for physical memory `[0, size)`.
///
/// The first [`EXTMEM`] bytes play the low-memory role, followed by a small
/// fake kernel image of `image_pages` pages.
pub struct Arena {
    ptr: *mut u8,
    size: usize,
    layout: MemoryLayout,
}

impl Arena {
    pub fn new(size: usize, image_pages: usize) -> Self {
        let alloc_layout = Layout::from_size_align(size, PAGE).unwrap();
        let ptr = unsafe { alloc_zeroed(alloc_layout) };
        assert!(!ptr.is_null());
        let base = ptr.expose_provenance();
        let text_end = base + EXTMEM as usize + PAGE;
        let end = base + EXTMEM as usize + image_pages * PAGE;
        let phys_top = PhysicalAddress::new(u32::try_from(size).unwrap());
        let layout = MemoryLayout::new(base, text_end, end, phys_top);
        Self { ptr, size, layout }
    }

    pub const fn layout(&self) -> MemoryLayout {
        self.layout
    }

    pub const fn base(&self) -> usize {
        self.layout.direct_map_base()
    }

    pub const fn kernel_end(&self) -> usize {
        self.layout.kernel_end()
    }

    pub const fn top(&self) -> usize {
        self.base() + self.size
    }

    /// Pages between the end of the image and the top of the arena.
    pub const fn usable_pages(&self) -> usize {
        (self.top() - self.kernel_end()) / PAGE
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let alloc_layout = Layout::from_size_align(self.size, PAGE).unwrap();
        unsafe { dealloc(self.ptr, alloc_layout) };
    }
}
