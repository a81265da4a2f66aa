//! # Virtual and Physical Memory Address Types (32-bit)
//!
//! Strongly typed wrappers for the raw addresses used by the two-level x86
//! paging scheme: user/kernel **virtual** addresses as seen through a page
//! directory, and **physical** frame addresses stored in page-table entries.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address in a 32-bit address space (translated by a page directory). |
//! | [`PhysicalAddress`] | An address of physical memory, as stored in a directory or table entry. |
//!
//! Both are `#[repr(transparent)]` over `u32`, so they cost nothing over the
//! raw integer but prevent mixing the two kinds by accident.
//!
//! ## Address split
//!
//! A virtual address is split into three fields by the MMU:
//!
//! ```text
//! | 31‒22           | 21‒12       | 11‒0   |
//! | directory index | table index | offset |
//! ```
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_3123);
//! assert_eq!(va.directory_index(), 1);
//! assert_eq!(va.table_index(), 3);
//! assert_eq!(va.page_offset(), 0x123);
//! assert_eq!(va.page_round_down().as_u32(), 0x0040_3000);
//! assert_eq!(page_round_up(0x1001), 0x2000);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical_address;
mod virtual_address;

pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;

/// Size of a page in bytes; the only allocation granularity.
pub const PAGE_SIZE: u32 = 4096;

/// log2([`PAGE_SIZE`]).
pub const PAGE_SHIFT: u32 = 12;

/// Bit position of the page-directory index within a virtual address.
pub const DIRECTORY_SHIFT: u32 = 22;

/// Number of entries in a page directory or page table.
pub const ENTRIES_PER_TABLE: usize = 1024;

const _: () = assert!(1 << PAGE_SHIFT == PAGE_SIZE);

/// Round `value` up to the next multiple of [`PAGE_SIZE`].
///
/// Wraps to zero for values in the last page of the address space; callers
/// bound their inputs below the kernel base first.
#[inline]
#[must_use]
pub const fn page_round_up(value: u32) -> u32 {
    value.wrapping_add(PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Round `value` down to a multiple of [`PAGE_SIZE`].
#[inline]
#[must_use]
pub const fn page_round_down(value: u32) -> u32 {
    value & !(PAGE_SIZE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(page_round_up(0), 0);
        assert_eq!(page_round_up(1), PAGE_SIZE);
        assert_eq!(page_round_up(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(page_round_down(PAGE_SIZE + 7), PAGE_SIZE);
        assert_eq!(page_round_up(u32::MAX), 0);
    }

    #[test]
    fn index_split_roundtrips() {
        let va = VirtualAddress::new(0xBFFF_E123);
        let rebuilt = (va.directory_index() << DIRECTORY_SHIFT)
            | (va.table_index() << PAGE_SHIFT)
            | va.page_offset();
        assert_eq!(rebuilt, va.as_u32());
    }
}
