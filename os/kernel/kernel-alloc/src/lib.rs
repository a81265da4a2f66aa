//! # Kernel Physical Page Allocator
//!
//! Hands out and reclaims whole 4096-byte physical pages. Free pages are kept
//! on an intrusive LIFO list whose links live inside the free pages
//! themselves, so the allocator needs no storage of its own.
//!
//! ```text
//!  head ─► ┌────────┐   ┌────────┐   ┌────────┐
//!          │ next ──┼──►│ next ──┼──►│ null   │
//!          │ 0x01.. │   │ 0x01.. │   │ 0x01.. │
//!          └────────┘   └────────┘   └────────┘
//! ```
//!
//! The kernel-wide instance is [`KMEM`]. It is filled in two steps (see
//! [`PagePool`]): a bootstrap phase that runs before other processors exist,
//! and a second phase that adds the remaining memory and turns on locking.
//!
//! ## Addresses
//!
//! Pages are identified by their kernel virtual address inside the direct map
//! described by a [`MemoryLayout`](kernel_info::layout::MemoryLayout). Page-table
//! code converts to physical addresses where the hardware needs them.
//!
//! ## Example
//! ```rust
//! use kernel_alloc::{PagePool, Phase};
//! use kernel_info::layout::MemoryLayout;
//! use kernel_memory_addresses::PhysicalAddress;
//! use std::alloc::{Layout, alloc, dealloc};
//!
//! // A 2 MiB stand-in for physical memory.
//! let size = 0x20_0000;
//! let arena_layout = Layout::from_size_align(size, 4096).unwrap();
//! let arena = unsafe { alloc(arena_layout) };
//! let base = arena.expose_provenance();
//!
//! let layout = MemoryLayout::new(
//!     base,
//!     base + 0x10_0000,
//!     base + 0x10_4000,
//!     PhysicalAddress::new(size as u32),
//! );
//!
//! let pool = PagePool::new();
//! unsafe { pool.init_phase1(layout, layout.kernel_end(), base + 0x18_0000) };
//! assert_eq!(pool.phase(), Phase::Bootstrap);
//! unsafe { pool.init_phase2(base + 0x18_0000, base + size) };
//! assert_eq!(pool.phase(), Phase::Running);
//! assert_eq!(pool.free_page_count(), (size - 0x10_4000) / 4096);
//!
//! let page = pool.alloc_page().unwrap();
//! unsafe { pool.free_page(page) };
//! # drop(pool);
//! # unsafe { dealloc(arena, arena_layout) };
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod free_list;
mod page_pool;

pub use page_pool::{PagePool, Phase};

/// The kernel's physical page pool.
pub static KMEM: PagePool = PagePool::new();
