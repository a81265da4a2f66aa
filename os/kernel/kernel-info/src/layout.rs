//! # Runtime Memory Layout
//!
//! The link step decides where the kernel image ends; the boot path decides
//! through which kernel-virtual window physical memory is reached. Both are
//! captured once in a [`MemoryLayout`] and handed to the page allocator.
//!
//! On the machine the direct map starts at [`KERNBASE`](crate::memory::KERNBASE)
//! and the image bounds come from the linker symbols `data` and `end`. On a
//! development host the direct map is simply a page-aligned arena.

use crate::memory::{EXTMEM, PAGE_SIZE, PHYSTOP};
use kernel_memory_addresses::PhysicalAddress;

/// Kernel view of physical memory.
///
/// All fields except `phys_top` are kernel pointers expressed as addresses
/// (`usize`), so the type stays `Copy` and `Send`.
///
/// # Example
/// ```rust
/// use kernel_info::layout::MemoryLayout;
/// use kernel_memory_addresses::PhysicalAddress;
///
/// let base = 0x8000_0000_usize;
/// let layout = MemoryLayout::new(
///     base,
///     base + 0x0012_0000,
///     base + 0x0014_2000,
///     PhysicalAddress::new(0x0040_0000),
/// );
/// assert_eq!(layout.virt_to_phys(base + 0x3000), PhysicalAddress::new(0x3000));
/// assert!(layout.in_direct_map(base + 0x3F_F000));
/// assert!(!layout.in_direct_map(base + 0x40_0000));
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryLayout {
    direct_map_base: usize,
    kernel_text_end: usize,
    kernel_end: usize,
    phys_top: PhysicalAddress,
}

impl MemoryLayout {
    /// Describe a direct map starting at `direct_map_base` that covers
    /// physical memory `[0, phys_top)`.
    ///
    /// - `kernel_text_end` is the first kernel address after text and
    ///   read-only data (the linker's `data`).
    /// - `kernel_end` is the first address after the kernel image (the
    ///   linker's `end`).
    ///
    /// # Panics
    /// - If the bounds are not ordered or the image does not fit below
    ///   `phys_top`.
    /// - If `direct_map_base`, `kernel_text_end` or `phys_top` is not
    ///   page-aligned. The text/data split is a mapping boundary.
    /// - If `phys_top` lies above [`PHYSTOP`], where the kernel window would
    ///   run into device space.
    #[must_use]
    pub const fn new(
        direct_map_base: usize,
        kernel_text_end: usize,
        kernel_end: usize,
        phys_top: PhysicalAddress,
    ) -> Self {
        const PAGE: usize = PAGE_SIZE as usize;
        assert!(
            direct_map_base.is_multiple_of(PAGE),
            "MemoryLayout: unaligned direct map base"
        );
        assert!(
            kernel_text_end.is_multiple_of(PAGE),
            "MemoryLayout: unaligned end of kernel text"
        );
        assert!(
            phys_top.is_page_aligned(),
            "MemoryLayout: unaligned top of memory"
        );
        assert!(
            phys_top.as_u32() <= PHYSTOP,
            "MemoryLayout: top of memory above PHYSTOP"
        );
        assert!(kernel_text_end >= direct_map_base + EXTMEM as usize);
        assert!(kernel_text_end <= kernel_end);
        assert!(kernel_end - direct_map_base <= phys_top.as_usize());
        Self {
            direct_map_base,
            kernel_text_end,
            kernel_end,
            phys_top,
        }
    }

    #[inline]
    #[must_use]
    pub const fn direct_map_base(&self) -> usize {
        self.direct_map_base
    }

    #[inline]
    #[must_use]
    pub const fn kernel_text_end(&self) -> usize {
        self.kernel_text_end
    }

    #[inline]
    #[must_use]
    pub const fn kernel_end(&self) -> usize {
        self.kernel_end
    }

    #[inline]
    #[must_use]
    pub const fn phys_top(&self) -> PhysicalAddress {
        self.phys_top
    }

    /// Whether `va` lies inside the direct map window.
    #[inline]
    #[must_use]
    pub const fn in_direct_map(&self, va: usize) -> bool {
        va >= self.direct_map_base && va - self.direct_map_base < self.phys_top.as_usize()
    }

    /// Kernel address at which physical address `pa` is visible.
    #[inline]
    #[must_use]
    pub const fn phys_to_virt(&self, pa: PhysicalAddress) -> usize {
        self.direct_map_base + pa.as_usize()
    }

    /// Physical address behind a direct-map kernel address.
    ///
    /// # Panics
    /// If `va` is outside the direct map.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn virt_to_phys(&self, va: usize) -> PhysicalAddress {
        assert!(
            self.in_direct_map(va),
            "virt_to_phys: address outside the direct map"
        );
        // phys_top is a u32, so the offset fits.
        PhysicalAddress::new((va - self.direct_map_base) as u32)
    }
}
