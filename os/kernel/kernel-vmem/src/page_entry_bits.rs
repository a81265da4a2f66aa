use bitfield_struct::bitfield;
use kernel_memory_addresses::{PAGE_SHIFT, PhysicalAddress};

/// A single 32-bit x86 paging entry in its raw bitfield form.
///
/// The same layout serves both levels: a **directory entry** (PDE) points to
/// a page table, a **table entry** (PTE) maps one 4 KiB page.
///
/// ### Bit layout
///
/// | Bits   | Name      | Meaning |
/// |--------|-----------|---------|
/// | 0      | `P`       | Present |
/// | 1      | `RW`      | Writable if set |
/// | 2      | `US`      | User-mode accessible if set |
/// | 3      | `PWT`     | Write-through caching |
/// | 4      | `PCD`     | Disable caching |
/// | 5      | `A`       | Accessed |
/// | 6      | `D`       | Dirty (PTE only) |
/// | 7      | `PS`      | 4 MiB page (PDE only, unused here) |
/// | 8      | `G`       | Global (PTE only) |
/// | 9–11   | avail     | Reserved for OS use |
/// | 12–31  | `addr`    | Physical frame bits [31:12] |
///
/// Permissions are the intersection over the walk: a page is user-writable
/// only if both its PDE and its PTE say so.
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::PhysicalAddress;
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::user_rw()
///     .with_present(true)
///     .with_physical_address(PhysicalAddress::new(0x0012_3000));
/// assert!(e.present() && e.writable() && e.user_access());
/// assert_eq!(e.physical_address(), PhysicalAddress::new(0x0012_3000));
/// assert_eq!(e.into_bits(), 0x0012_3007);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    ///
    /// Clear restricts the mapping to the kernel; the user stack guard page
    /// is a present page with this bit clear.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on the first write through a PTE.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Never set by this kernel.
    pub large_page: bool,

    /// Global (G, bit 8).
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    frame: u32,
}

impl PageEntryBits {
    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        self.set_frame(phys.as_u32() >> PAGE_SHIFT);
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, phys: PhysicalAddress) -> Self {
        self.set_physical_address(phys);
        self
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame() << PAGE_SHIFT)
    }

    /// Kernel-only, read-only.
    #[inline]
    #[must_use]
    pub const fn kernel_ro() -> Self {
        Self::new()
    }

    /// Kernel-only, writable.
    #[inline]
    #[must_use]
    pub const fn kernel_rw() -> Self {
        Self::new().with_writable(true)
    }

    /// User-accessible, writable. Used for every user page and for
    /// directory entries, which then defer to the PTE.
    ///
    /// Like the other presets this carries permissions only; the mapping
    /// code sets `present`.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new().with_writable(true).with_user_access(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_high_bits() {
        let mut e = PageEntryBits::new();
        e.set_physical_address(PhysicalAddress::new(0xFFFF_F000));
        assert_eq!(e.into_bits(), 0xFFFF_F000);
        assert_eq!(e.physical_address(), PhysicalAddress::new(0xFFFF_F000));
        assert!(!e.present());
    }

    #[test]
    fn flag_bits_match_hardware_positions() {
        let e = PageEntryBits::new();
        assert_eq!(e.with_present(true).into_bits(), 0x001);
        assert_eq!(e.with_writable(true).into_bits(), 0x002);
        assert_eq!(e.with_user_access(true).into_bits(), 0x004);
        assert_eq!(e.with_large_page(true).into_bits(), 0x080);
    }

    #[test]
    fn kernel_presets_are_not_user_accessible() {
        assert!(!PageEntryBits::kernel_ro().user_access());
        assert!(!PageEntryBits::kernel_ro().writable());
        assert!(PageEntryBits::kernel_rw().writable());
        assert!(!PageEntryBits::kernel_rw().user_access());
    }
}
