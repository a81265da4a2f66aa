use crate::{DIRECTORY_SHIFT, PAGE_SHIFT, PAGE_SIZE, page_round_down, page_round_up};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Virtual memory address in a 32-bit address space.
///
/// Carries only the *kind* of address; no range is enforced. User addresses
/// live below the kernel base, kernel addresses above it.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::new(0x1000);
/// assert!(va.is_page_aligned());
/// assert_eq!(va.checked_add(u32::MAX), None);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u32);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index into the page directory (bits 31‒22).
    #[inline]
    #[must_use]
    pub const fn directory_index(self) -> u32 {
        (self.0 >> DIRECTORY_SHIFT) & 0x3FF
    }

    /// Index into the page table (bits 21‒12).
    #[inline]
    #[must_use]
    pub const fn table_index(self) -> u32 {
        (self.0 >> PAGE_SHIFT) & 0x3FF
    }

    /// Offset within the page (bits 11‒0).
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u32 {
        self.0 & (PAGE_SIZE - 1)
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    #[inline]
    #[must_use]
    pub const fn page_round_down(self) -> Self {
        Self(page_round_down(self.0))
    }

    #[inline]
    #[must_use]
    pub const fn page_round_up(self) -> Self {
        Self(page_round_up(self.0))
    }

    /// Offset the address, returning `None` if it would wrap past `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u32) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u32 {
    #[inline]
    fn from(v: VirtualAddress) -> Self {
        v.as_u32()
    }
}

impl Add<u32> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u32> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}
