//! # Address Space (32-bit x86, directory-rooted)
//!
//! One page directory plus the size of the user image it maps. Every
//! page-table page and every user page comes from a [`PagePool`] and goes back
//! to it when the [`AddressSpace`] is dropped.
//!
//! ## Highlights
//!
//! - [`AddressSpace::new_kernel_only`] builds a directory holding only the
//!   shared kernel mappings.
//! - [`AddressSpace::grow`] / [`AddressSpace::shrink`] move the top of the
//!   user image, allocating or releasing zeroed pages.
//! - [`AddressSpace::load`] fills mapped pages from a [`ReadAt`] source.
//! - [`AddressSpace::copy_out`] / [`AddressSpace::copy_in`] move bytes
//!   to and from user pages without activating the space.
//!
//! ## Addressing
//!
//! Page-table entries hold 32-bit physical addresses. The kernel touches a
//! frame through the pool's direct map
//! ([`MemoryLayout::phys_to_virt`](kernel_info::layout::MemoryLayout::phys_to_virt)).
//!
//! ## Safety
//!
//! Changing the mappings of the *active* directory requires TLB maintenance
//! by the caller. Exec only ever edits a directory that is not yet active.

use crate::page_table::PageTable;
use crate::{PageEntryBits, ReadAt, VmError};
use core::fmt;
use core::ptr::{NonNull, with_exposed_provenance_mut};
use kernel_alloc::PagePool;
use kernel_info::layout::MemoryLayout;
use kernel_info::memory::{EXTMEM, KERNBASE, KERNLINK, PAGE_SIZE};
use kernel_memory_addresses::{
    DIRECTORY_SHIFT, PhysicalAddress, VirtualAddress, page_round_down, page_round_up,
};

const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// Handle to a single address space.
///
/// # Invariants
/// - `root` is a page from `pool` holding a [`PageTable`].
/// - Every present user PTE below `size` (rounded up) maps a page owned by
///   this space; every present PDE points to a table owned by this space.
pub struct AddressSpace<'p> {
    pool: &'p PagePool,
    root: NonNull<PageTable>,
    size: u32,
}

/// One of the fixed kernel mappings present in every directory.
struct KernelRegion {
    virt: VirtualAddress,
    phys_start: PhysicalAddress,
    phys_end: PhysicalAddress,
    perm: PageEntryBits,
}

/// Kernel mappings for `layout`: low I/O memory, read-only text, writable
/// data up to the top of physical memory.
///
/// Device space above `DEVSPACE` is left out; no driver here needs it.
const fn kernel_regions(layout: &MemoryLayout) -> [KernelRegion; 3] {
    let data = layout.virt_to_phys(layout.kernel_text_end());
    [
        KernelRegion {
            virt: VirtualAddress::new(KERNBASE),
            phys_start: PhysicalAddress::zero(),
            phys_end: PhysicalAddress::new(EXTMEM),
            perm: PageEntryBits::kernel_rw(),
        },
        KernelRegion {
            virt: VirtualAddress::new(KERNLINK),
            phys_start: PhysicalAddress::new(EXTMEM),
            phys_end: data,
            perm: PageEntryBits::kernel_ro(),
        },
        KernelRegion {
            virt: VirtualAddress::new(KERNBASE + data.as_u32()),
            phys_start: data,
            phys_end: layout.phys_top(),
            perm: PageEntryBits::kernel_rw(),
        },
    ]
}

/// Allocate a page and zero it.
fn alloc_zeroed(pool: &PagePool) -> Option<NonNull<u8>> {
    let page = pool.alloc_page()?;
    unsafe { page.as_ptr().write_bytes(0, PAGE_BYTES) };
    Some(page)
}

impl<'p> AddressSpace<'p> {
    /// Fresh directory containing only the kernel mappings.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] if the pool cannot supply the directory or a
    /// table; whatever was allocated is returned first.
    ///
    /// # Panics
    /// If `pool` has not been initialized.
    pub fn new_kernel_only(pool: &'p PagePool) -> Result<Self, VmError> {
        let root = alloc_zeroed(pool).ok_or(VmError::OutOfMemory)?;
        let mut space = Self {
            pool,
            root: root.cast(),
            size: 0,
        };
        for region in kernel_regions(pool.layout()) {
            let len = region.phys_end.as_u32() - region.phys_start.as_u32();
            space.map_pages(region.virt, len, region.phys_start, region.perm)?;
        }
        Ok(space)
    }

    /// Physical address of the page directory (the value for CR3).
    #[must_use]
    pub fn root(&self) -> PhysicalAddress {
        self.layout().virt_to_phys(self.root.as_ptr().addr())
    }

    /// Bytes of user memory mapped from address zero.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Borrow the page directory.
    #[must_use]
    pub const fn directory(&self) -> &PageTable {
        unsafe { self.root.as_ref() }
    }

    #[inline]
    fn layout(&self) -> &'p MemoryLayout {
        self.pool.layout()
    }

    /// Kernel pointer to the frame at `pa`.
    fn frame_ptr<T>(&self, pa: PhysicalAddress) -> NonNull<T> {
        let va = self.layout().phys_to_virt(pa);
        let Some(ptr) = NonNull::new(with_exposed_provenance_mut::<T>(va)) else {
            panic!("frame_ptr: null kernel address for {pa}");
        };
        ptr
    }

    fn release_frame(&self, pa: PhysicalAddress) {
        let page = self.frame_ptr::<u8>(pa);
        unsafe { self.pool.free_page(page) };
    }

    /// The PTE for `va`, creating its page table if `alloc` is set.
    ///
    /// Returns `None` if the table is missing and `alloc` is clear, or the
    /// pool is exhausted. The returned entry may be non-present.
    pub fn walk(&mut self, va: VirtualAddress, alloc: bool) -> Option<&mut PageEntryBits> {
        let layout = self.layout();
        let dir = unsafe { self.root.as_mut() };
        let pde = &mut dir.entries[va.directory_index() as usize];
        let table: NonNull<PageTable> = if pde.present() {
            let va = layout.phys_to_virt(pde.physical_address());
            NonNull::new(with_exposed_provenance_mut(va))?
        } else {
            if !alloc {
                return None;
            }
            let page = alloc_zeroed(self.pool)?;
            // Permissive at the directory level; the PTE decides.
            *pde = PageEntryBits::user_rw()
                .with_present(true)
                .with_physical_address(layout.virt_to_phys(page.as_ptr().addr()));
            page.cast()
        };
        let table = unsafe { &mut *table.as_ptr() };
        Some(&mut table.entries[va.table_index() as usize])
    }

    /// Copy of the PTE for `va`, or `None` if no page table covers it.
    ///
    /// Unlike [`walk`](Self::walk) this never allocates and never hands out
    /// a mutable entry.
    #[must_use]
    pub fn entry(&self, va: VirtualAddress) -> Option<PageEntryBits> {
        let pde = self.directory().get(va.directory_index() as usize);
        if !pde.present() {
            return None;
        }
        let table = self.frame_ptr::<PageTable>(pde.physical_address());
        Some(unsafe { table.as_ref() }.get(va.table_index() as usize))
    }

    /// Map `[va, va + len)` to consecutive frames starting at `pa` with `perm`.
    ///
    /// `va` and `len` need not be aligned; every page they touch is mapped.
    ///
    /// # Errors
    /// [`VmError::OutOfMemory`] if a page table cannot be allocated. Entries
    /// installed before the failure stay in place.
    ///
    /// # Panics
    /// If a page in the range is already mapped, or the range wraps.
    pub fn map_pages(
        &mut self,
        va: VirtualAddress,
        len: u32,
        pa: PhysicalAddress,
        perm: PageEntryBits,
    ) -> Result<(), VmError> {
        if len == 0 {
            return Ok(());
        }
        let Some(last) = va.as_u32().checked_add(len - 1) else {
            panic!("map_pages: {va} + {len:#x} wraps");
        };
        let last = page_round_down(last);
        let mut a = va.page_round_down().as_u32();
        let mut pa = pa.page_round_down();
        loop {
            let pte = self
                .walk(VirtualAddress::new(a), true)
                .ok_or(VmError::OutOfMemory)?;
            assert!(
                !pte.present(),
                "map_pages: remap at {}",
                VirtualAddress::new(a)
            );
            *pte = perm.with_present(true).with_physical_address(pa);
            if a == last {
                break;
            }
            a += PAGE_SIZE;
            pa = pa + PAGE_SIZE;
        }
        Ok(())
    }

    /// Grow the user image to `new_size` bytes with zeroed, user-writable pages.
    ///
    /// Returns the resulting size; a `new_size` below the current size is a
    /// no-op that reports the current size.
    ///
    /// # Errors
    /// - [`VmError::AboveUserLimit`] if `new_size` reaches `KERNBASE`.
    /// - [`VmError::OutOfMemory`] on exhaustion; pages added by this call are
    ///   released again and the size is unchanged.
    pub fn grow(&mut self, new_size: u32) -> Result<u32, VmError> {
        if new_size >= KERNBASE {
            return Err(VmError::AboveUserLimit(new_size));
        }
        let old_size = self.size;
        if new_size < old_size {
            return Ok(old_size);
        }

        let mut a = page_round_up(old_size);
        while a < new_size {
            let Some(page) = alloc_zeroed(self.pool) else {
                log::warn!("grow: out of memory at {}", VirtualAddress::new(a));
                self.release_range(new_size, old_size);
                return Err(VmError::OutOfMemory);
            };
            let pa = self.layout().virt_to_phys(page.as_ptr().addr());
            let user = PageEntryBits::user_rw();
            if let Err(e) = self.map_pages(VirtualAddress::new(a), PAGE_SIZE, pa, user) {
                log::warn!("grow: no page table for {}", VirtualAddress::new(a));
                unsafe { self.pool.free_page(page) };
                self.release_range(new_size, old_size);
                return Err(e);
            }
            a += PAGE_SIZE;
        }
        self.size = new_size;
        Ok(new_size)
    }

    /// Shrink the user image to `new_size` bytes, freeing the pages above it.
    ///
    /// Returns the resulting size; a `new_size` at or above the current size
    /// is a no-op.
    pub fn shrink(&mut self, new_size: u32) -> u32 {
        if new_size >= self.size {
            return self.size;
        }
        self.release_range(self.size, new_size);
        self.size = new_size;
        new_size
    }

    /// Free every present page in `[round_up(new_size), old_size)`.
    ///
    /// Directory slots without a table are skipped as a whole.
    fn release_range(&mut self, old_size: u32, new_size: u32) {
        let mut a = page_round_up(new_size);
        while a < old_size {
            let va = VirtualAddress::new(a);
            match self.walk(va, false) {
                None => {
                    // Jump to the first page of the next directory slot.
                    a = (va.directory_index() + 1) << DIRECTORY_SHIFT;
                    continue;
                }
                Some(pte) if pte.present() => {
                    let pa = pte.physical_address();
                    *pte = PageEntryBits::new();
                    self.release_frame(pa);
                }
                Some(_) => {}
            }
            a += PAGE_SIZE;
        }
    }

    /// Fill the mapped pages at `va` with `len` bytes of `src` starting at
    /// `offset`.
    ///
    /// # Errors
    /// - [`VmError::Unaligned`] if `va` is not page-aligned.
    /// - [`VmError::Unmapped`] if a page in the range is not mapped.
    /// - [`VmError::ShortRead`] if `src` ends early.
    pub fn load<R: ReadAt + ?Sized>(
        &mut self,
        va: VirtualAddress,
        src: &mut R,
        offset: u32,
        len: u32,
    ) -> Result<(), VmError> {
        if !va.is_page_aligned() {
            return Err(VmError::Unaligned(va));
        }
        let mut i = 0;
        while i < len {
            let page_va = va.checked_add(i).ok_or(VmError::Unmapped(va))?;
            let pte = self
                .entry(page_va)
                .filter(PageEntryBits::present)
                .ok_or(VmError::Unmapped(page_va))?;
            let n = (len - i).min(PAGE_SIZE) as usize;
            let file_off = offset.checked_add(i).ok_or(VmError::ShortRead)?;
            let dst = self.frame_ptr::<u8>(pte.physical_address());
            let dst = unsafe { core::slice::from_raw_parts_mut(dst.as_ptr(), n) };
            if src.read_at(dst, file_off) != n {
                return Err(VmError::ShortRead);
            }
            i += PAGE_SIZE;
        }
        Ok(())
    }

    /// Make the page at `va` inaccessible from user mode.
    ///
    /// Used for the guard page below the user stack.
    ///
    /// # Panics
    /// If no page table covers `va`.
    pub fn clear_user(&mut self, va: VirtualAddress) {
        let Some(pte) = self.walk(va, false) else {
            panic!("clear_user: no page table for {va}");
        };
        pte.set_user_access(false);
    }

    /// Kernel pointer to the start of the user page containing `va`.
    ///
    /// `None` if the page is absent or not user-accessible.
    #[must_use]
    pub fn user_to_kernel(&self, va: VirtualAddress) -> Option<NonNull<u8>> {
        let pte = self.entry(va)?;
        if !pte.present() || !pte.user_access() {
            return None;
        }
        Some(self.frame_ptr(pte.physical_address()))
    }

    /// Copy `bytes` to user address `va`.
    ///
    /// # Errors
    /// [`VmError::Unmapped`] at the first page that is not a present user
    /// page. Bytes before it have already been written.
    pub fn copy_out(&mut self, va: VirtualAddress, mut bytes: &[u8]) -> Result<(), VmError> {
        let mut va = va;
        while !bytes.is_empty() {
            let page_va = va.page_round_down();
            let page = self
                .user_to_kernel(page_va)
                .ok_or(VmError::Unmapped(page_va))?;
            let off = va.page_offset() as usize;
            let n = (PAGE_BYTES - off).min(bytes.len());
            unsafe {
                page.as_ptr()
                    .add(off)
                    .copy_from_nonoverlapping(bytes.as_ptr(), n);
            }
            bytes = &bytes[n..];
            va = page_va + PAGE_SIZE;
        }
        Ok(())
    }

    /// Copy bytes from user address `va` into `buf`.
    ///
    /// # Errors
    /// [`VmError::Unmapped`] at the first page that is not a present user page.
    pub fn copy_in(&self, va: VirtualAddress, buf: &mut [u8]) -> Result<(), VmError> {
        let mut va = va;
        let mut done = 0;
        while done < buf.len() {
            let page_va = va.page_round_down();
            let page = self
                .user_to_kernel(page_va)
                .ok_or(VmError::Unmapped(page_va))?;
            let off = va.page_offset() as usize;
            let n = (PAGE_BYTES - off).min(buf.len() - done);
            unsafe {
                page.as_ptr()
                    .add(off)
                    .copy_to_nonoverlapping(buf[done..].as_mut_ptr(), n);
            }
            done += n;
            va = page_va + PAGE_SIZE;
        }
        Ok(())
    }
}

impl Drop for AddressSpace<'_> {
    /// Free all user pages, then every page table, then the directory.
    fn drop(&mut self) {
        self.release_range(KERNBASE, 0);
        for (_, pde) in self.directory().present_entries() {
            self.release_frame(pde.physical_address());
        }
        let root = self.root.cast::<u8>();
        unsafe { self.pool.free_page(root) };
    }
}

impl fmt::Debug for AddressSpace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("root", &self.root())
            .field("size", &format_args!("{:#x}", self.size))
            .finish_non_exhaustive()
    }
}
