//! # Kernel Configuration and Memory Layout
//!
//! This crate is the single source of truth for the constants shared by the
//! page allocator, the page-table code and the program loader, plus the
//! runtime [`MemoryLayout`](layout::MemoryLayout) describing where the kernel
//! image ends and how physical memory is reached.
//!
//! ## Organization
//!
//! * [`memory`]: physical/virtual layout constants (`KERNBASE`, `PHYSTOP`, …)
//! * [`param`]: kernel parameters (`MAXARG`, process name length, stack shape)
//! * [`layout`]: the runtime direct-map description handed to phase 1 of the
//!   page allocator
//!
//! ## Virtual Memory Architecture
//!
//! Every address space shares the same upper half:
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  User text / data / bss         │
//!             ├─────────────────────────────────┤
//!             │  Guard page (not user-visible)  │
//!             ├─────────────────────────────────┤
//!             │  User stack (one page)          │
//!             ├─────────────────────────────────┤
//!             │  (unmapped, free for growth)    │
//! KERNBASE    ├─────────────────────────────────┤ 0x8000_0000
//!             │  I/O space (phys 0 .. EXTMEM)   │
//! KERNLINK    ├─────────────────────────────────┤ 0x8010_0000
//!             │  Kernel text + rodata (RO)      │
//!             ├─────────────────────────────────┤ data
//!             │  Kernel data + free memory (RW) │
//! KERNBASE +  ├─────────────────────────────────┤
//! PHYSTOP     │  (unmapped)                     │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Low memory (< 1 MiB)           │
//! EXTMEM      ├─────────────────────────────────┤ 0x0010_0000
//!             │  Kernel image (text, data, bss) │
//! end         ├─────────────────────────────────┤
//!             │  Free pages (page allocator)    │
//! PHYSTOP     └─────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod layout;
pub mod memory;
pub mod param;
