//! # Program Loading
//!
//! Everything that turns an ELF32 file into something the CPU can run:
//!
//! - [`elf`]: the on-disk header and program header formats.
//! - [`Loader::exec`]: build a new user address space for a process from a
//!   file and switch to it, all or nothing.
//! - [`boot::boot_main`]: the flat boot loader that places the kernel image
//!   at its physical addresses before paging is on.
//!
//! The filesystem ([`fs::FileSystem`]) and the MMU ([`kernel_vmem::Mmu`]) are
//! collaborators supplied by the caller.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod boot;
pub mod elf;
mod error;
mod exec;
pub mod fs;
mod proc;

pub use crate::error::ExecError;
pub use crate::exec::{ExecState, Loader, display_name};
pub use crate::proc::{Process, TrapFrame};
