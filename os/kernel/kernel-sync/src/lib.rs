//! # Kernel synchronization primitives
//!
//! [`BootLock`] is the lock behind kernel-wide state that must be usable
//! before the machine is multiprocessor-safe: it starts in *bootstrap* mode,
//! where acquiring never waits, and is switched exactly once into *enforced*
//! mode, where it behaves like a test-and-test-and-set spin lock.
//!
//! [`SyncOnceCell`] holds boot-time facts written once and read lock-free.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod boot_lock;
mod sync_once_cell;

pub use boot_lock::{BootLock, BootLockGuard};
pub use sync_once_cell::SyncOnceCell;
