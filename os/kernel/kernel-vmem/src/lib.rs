//! # Virtual Memory Support
//!
//! Two-level 32-bit x86 paging on top of the [`kernel_alloc`] page pool.
//!
//! ## What you get
//! - [`PageEntryBits`], the raw PDE/PTE bitfield.
//! - [`PageTable`], a 4 KiB-aligned array of 1024 entries.
//! - [`AddressSpace`], one page directory plus the size of the user image it
//!   maps; dropping it returns every page it owns to the pool.
//! - Collaborator traits: [`ReadAt`] (file contents for loading) and [`Mmu`]
//!   (activation of a directory).
//!
//! ## Virtual Address → Physical Address Walk
//!
//! ```text
//! | 31‒22 | 21‒12 | 11‒0   |
//! |  Dir  | Table | Offset |
//!
//!  CR3 → Page Directory → Page Table → 4 KiB page
//! ```
//!
//! ## Virtual layout of every address space
//!
//! ```text
//! 0x0000_0000 ┌──────────────────────────────┐
//!             │ user image, guard, stack     │  (grows with `grow`)
//! KERNBASE    ├──────────────────────────────┤
//!             │ low 1 MiB (I/O space)    rw  │
//! KERNLINK    ├──────────────────────────────┤
//!             │ kernel text + rodata     ro  │
//! data        ├──────────────────────────────┤
//!             │ kernel data + free pages rw  │
//! KERNBASE +  └──────────────────────────────┘
//!   phys_top
//! ```
//!
//! The kernel half is identical in every directory so a system call can touch
//! kernel memory without switching.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod page_entry_bits;
mod page_table;

pub use crate::address_space::AddressSpace;
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::PageTable;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Errors reported by [`AddressSpace`] operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// The page pool is exhausted.
    #[error("out of memory")]
    OutOfMemory,
    /// The requested size reaches into the kernel half.
    #[error("size {0:#x} reaches kernel space")]
    AboveUserLimit(u32),
    /// No page (or no user page) is mapped at the address.
    #[error("no page mapped at {0}")]
    Unmapped(VirtualAddress),
    /// The address must be page-aligned.
    #[error("address {0} is not page-aligned")]
    Unaligned(VirtualAddress),
    /// The source returned fewer bytes than requested.
    #[error("short read")]
    ShortRead,
}

/// Positional reads from a file-like source.
pub trait ReadAt {
    /// Read up to `dst.len()` bytes starting at byte `offset`.
    ///
    /// Returns the number of bytes actually read; anything less than
    /// `dst.len()` means the source ended.
    fn read_at(&mut self, dst: &mut [u8], offset: u32) -> usize;
}

/// The processor's view of the current user address space.
pub trait Mmu {
    /// Make the directory at `root` the active one for the current process
    /// (load CR3, update the task state's kernel stack).
    fn switch_uvm(&self, root: PhysicalAddress);
}

impl<T: ReadAt + ?Sized> ReadAt for &mut T {
    fn read_at(&mut self, dst: &mut [u8], offset: u32) -> usize {
        (**self).read_at(dst, offset)
    }
}

impl ReadAt for &[u8] {
    fn read_at(&mut self, dst: &mut [u8], offset: u32) -> usize {
        let Some(src) = self.get(offset as usize..) else {
            return 0;
        };
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        n
    }
}
