//! # Filesystem collaborator
//!
//! Exec needs a handful of filesystem services. They are expressed as traits
//! so the loader can run against the real inode layer or a test double, and
//! the pairing rules (every `begin_op` gets an `end_op`, every locked inode
//! is unlocked and released) are enforced by guards.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use kernel_vmem::ReadAt;

/// The filesystem as seen by exec.
pub trait FileSystem {
    type Inode: Inode;

    /// Start a filesystem transaction.
    fn begin_op(&self);

    /// Finish the transaction started by [`begin_op`](Self::begin_op).
    fn end_op(&self);

    /// Look up `path`, returning a referenced but unlocked inode.
    fn namei(&self, path: &[u8]) -> Option<Self::Inode>;
}

/// A referenced inode. Reads require the inode to be locked.
pub trait Inode: ReadAt {
    fn lock(&mut self);

    /// Unlock the inode and drop the reference.
    fn unlock_put(self);
}

/// An open filesystem transaction; ends it on drop.
#[must_use]
pub struct FsTransaction<'f, F: FileSystem + ?Sized> {
    fs: &'f F,
}

impl<'f, F: FileSystem + ?Sized> FsTransaction<'f, F> {
    pub fn begin(fs: &'f F) -> Self {
        fs.begin_op();
        Self { fs }
    }
}

impl<F: FileSystem + ?Sized> Drop for FsTransaction<'_, F> {
    fn drop(&mut self) {
        self.fs.end_op();
    }
}

/// A locked inode; unlocks and releases it on drop.
#[must_use]
pub struct LockedInode<I: Inode> {
    inode: ManuallyDrop<I>,
}

impl<I: Inode> LockedInode<I> {
    pub fn lock(mut inode: I) -> Self {
        inode.lock();
        Self {
            inode: ManuallyDrop::new(inode),
        }
    }
}

impl<I: Inode> Deref for LockedInode<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.inode
    }
}

impl<I: Inode> DerefMut for LockedInode<I> {
    fn deref_mut(&mut self) -> &mut I {
        &mut self.inode
    }
}

impl<I: Inode> Drop for LockedInode<I> {
    fn drop(&mut self) {
        // SAFETY: taken exactly once, here.
        let inode = unsafe { ManuallyDrop::take(&mut self.inode) };
        inode.unlock_put();
    }
}
