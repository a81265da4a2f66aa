//! # Exec
//!
//! Replace a process's user image with a program read from the filesystem.
//!
//! ## Protocol
//!
//! ```text
//! Opening ─► HeaderChecked ─► SegmentsLoaded ─► StackBuilt ─► Committed
//!    │             │                 │               │
//!    └─────────────┴────── Failed ◄──┴───────────────┘
//! ```
//!
//! 1. Open a transaction, look up and lock the file.
//! 2. Read and check the ELF header.
//! 3. Build a fresh kernel-only [`AddressSpace`] and load every `PT_LOAD`
//!    segment into it.
//! 4. Release the file and end the transaction.
//! 5. Add a guard page and a stack page; push the argument strings and the
//!    `main(argc, argv)` frame.
//! 6. Commit: swap the new space in, set `eip`/`esp`, activate, free the old
//!    space.
//!
//! ## Rollback
//!
//! Until the commit the new space is owned by the loader alone. A failure
//! drops it, then the inode guard, then the transaction guard (reverse
//! declaration order), and the process is left exactly as it was.
//!
//! ## Initial user stack
//!
//! ```text
//!  top ─► ┌──────────────────────┐
//!         │ "argN-1\0" ...       │  strings, each start 4-byte aligned
//!         │ "arg0\0"             │
//!         ├──────────────────────┤
//!         │ 0                    │  argv[argc]
//!         │ &arg(argc-1)         │
//!         │ ...                  │
//!         │ &arg0                │  ◄─ argv
//!         │ argv                 │
//!         │ argc                 │
//!  esp ─► │ 0xFFFF_FFFF          │  fake return address
//!         ├──────────────────────┤
//!         │ rest of stack page   │
//!         ├──────────────────────┤
//!         │ guard (kernel-only)  │
//!         └──────────────────────┘
//! ```

use crate::ExecError;
use crate::elf::{ElfHeader, ProgramHeader};
use crate::fs::{FileSystem, FsTransaction, LockedInode};
use crate::proc::Process;
use kernel_alloc::PagePool;
use kernel_info::memory::PAGE_SIZE;
use kernel_info::param::{MAXARG, STACK_GUARD_PAGES, STACK_SENTINEL, USER_STACK_PAGES};
use kernel_memory_addresses::{VirtualAddress, page_round_up};
use kernel_vmem::{AddressSpace, Mmu, ReadAt};

/// Words in the initial frame: sentinel, argc, argv, `MAXARG` pointers, null.
const USTACK_WORDS: usize = 3 + MAXARG + 1;

/// Progress of one exec attempt; reported when it fails.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecState {
    Opening,
    HeaderChecked,
    SegmentsLoaded,
    StackBuilt,
    Committed,
}

/// Loads programs into processes.
///
/// Bundles the collaborators exec needs: the page pool new address spaces
/// are built from, the filesystem images are read from, and the MMU that
/// activates the new space.
pub struct Loader<'a, 'p, F: ?Sized, M: ?Sized> {
    pool: &'p PagePool,
    fs: &'a F,
    mmu: &'a M,
}

/// Text after the last `/` of `path`.
#[must_use]
pub fn display_name(path: &[u8]) -> &[u8] {
    path.iter()
        .rposition(|&b| b == b'/')
        .map_or(path, |i| &path[i + 1..])
}

/// `arg` up to its first NUL, if it has one.
fn c_str(arg: &[u8]) -> &[u8] {
    arg.iter().position(|&b| b == 0).map_or(arg, |n| &arg[..n])
}

impl<'a, 'p, F, M> Loader<'a, 'p, F, M>
where
    F: FileSystem + ?Sized,
    M: Mmu + ?Sized,
{
    pub const fn new(pool: &'p PagePool, fs: &'a F, mmu: &'a M) -> Self {
        Self { pool, fs, mmu }
    }

    /// Run the program at `path` in `proc` with arguments `argv`.
    ///
    /// On success the process's address space, saved `eip`/`esp` and name
    /// are replaced and the new space is active. Exec never waits for
    /// memory; exhaustion is an error like any other.
    ///
    /// # Errors
    /// Any [`ExecError`]. The process is unchanged and every page allocated
    /// by the attempt has been returned to the pool.
    pub fn exec<P, A>(&self, proc: &mut Process<'p>, path: P, argv: &[A]) -> Result<(), ExecError>
    where
        P: AsRef<[u8]>,
        A: AsRef<[u8]>,
    {
        let path = path.as_ref();
        let mut state = ExecState::Opening;
        let result = self.try_exec(proc, path, argv, &mut state);
        match &result {
            Ok(()) => log::info!(
                "exec {}: entry {:#010x}, size {:#x}, argc {}",
                path.escape_ascii(),
                proc.tf.eip,
                proc.size(),
                argv.len()
            ),
            Err(e) => log::warn!("exec {}: failed in {state:?}: {e}", path.escape_ascii()),
        }
        result
    }

    fn try_exec<A: AsRef<[u8]>>(
        &self,
        proc: &mut Process<'p>,
        path: &[u8],
        argv: &[A],
        state: &mut ExecState,
    ) -> Result<(), ExecError> {
        // Drop order on failure: space, inode, transaction.
        let txn = FsTransaction::begin(self.fs);
        let inode = self.fs.namei(path).ok_or(ExecError::NotFound)?;
        let mut ip = LockedInode::lock(inode);

        let mut header = [0; ElfHeader::SIZE];
        if ip.read_at(&mut header, 0) != ElfHeader::SIZE {
            return Err(ExecError::ShortRead);
        }
        let elf = ElfHeader::parse(&header);
        elf.validate()?;
        *state = ExecState::HeaderChecked;

        let mut space = AddressSpace::new_kernel_only(self.pool)?;
        for i in 0..elf.e_phnum {
            let off = elf
                .program_header_offset(i)
                .ok_or(ExecError::AddressOverflow)?;
            let mut raw = [0; ProgramHeader::SIZE];
            if ip.read_at(&mut raw, off) != ProgramHeader::SIZE {
                return Err(ExecError::ShortRead);
            }
            let ph = ProgramHeader::parse(&raw);
            if !ph.is_load() {
                continue;
            }
            load_segment(&mut space, &mut *ip, &ph)?;
        }
        drop(ip);
        drop(txn);
        *state = ExecState::SegmentsLoaded;

        let sp = build_stack(&mut space, argv)?;
        *state = ExecState::StackBuilt;

        proc.set_name(display_name(path));
        let old = proc.replace_space(space);
        proc.tf.eip = elf.e_entry;
        proc.tf.esp = sp;
        self.mmu.switch_uvm(proc.space().root());
        drop(old);
        *state = ExecState::Committed;
        Ok(())
    }
}

/// Map `ph` into `space` and copy its file bytes; the rest stays zero.
fn load_segment<R: ReadAt + ?Sized>(
    space: &mut AddressSpace<'_>,
    src: &mut R,
    ph: &ProgramHeader,
) -> Result<(), ExecError> {
    if ph.p_memsz < ph.p_filesz {
        return Err(ExecError::SegmentTruncated {
            filesz: ph.p_filesz,
            memsz: ph.p_memsz,
        });
    }
    let end = ph
        .p_vaddr
        .checked_add(ph.p_memsz)
        .ok_or(ExecError::AddressOverflow)?;
    space.grow(end)?;
    let vaddr = VirtualAddress::new(ph.p_vaddr);
    if !vaddr.is_page_aligned() {
        return Err(ExecError::UnalignedSegment(vaddr));
    }
    space.load(vaddr, src, ph.p_offset, ph.p_filesz)?;
    log::debug!(
        "exec: loaded {vaddr} filesz {:#x} memsz {:#x}",
        ph.p_filesz,
        ph.p_memsz
    );
    Ok(())
}

/// Add the guard and stack pages above the image, push `argv`, and return
/// the initial stack pointer.
#[allow(clippy::cast_possible_truncation)]
fn build_stack<A>(space: &mut AddressSpace<'_>, argv: &[A]) -> Result<u32, ExecError>
where
    A: AsRef<[u8]>,
{
    let base = page_round_up(space.size());
    let top = space.grow(base + (STACK_GUARD_PAGES + USER_STACK_PAGES) * PAGE_SIZE)?;
    for g in 0..STACK_GUARD_PAGES {
        space.clear_user(VirtualAddress::new(base + g * PAGE_SIZE));
    }

    let mut sp = top;
    let mut ustack = [0_u32; USTACK_WORDS];
    let mut argc = 0;
    for arg in argv {
        if argc >= MAXARG {
            return Err(ExecError::TooManyArgs);
        }
        let arg = c_str(arg.as_ref());
        let len = u32::try_from(arg.len()).map_err(|_| overflow())?;
        let need = len.checked_add(1).ok_or_else(overflow)?;
        sp = sp.checked_sub(need).ok_or_else(overflow)? & !3;
        space.copy_out(VirtualAddress::new(sp), arg)?;
        space.copy_out(VirtualAddress::new(sp) + len, &[0])?;
        ustack[3 + argc] = sp;
        argc += 1;
    }
    ustack[3 + argc] = 0;

    // argc <= MAXARG, so these fit.
    let words = 3 + argc + 1;
    let frame_len = (words * 4) as u32;
    let argc = argc as u32;
    ustack[0] = STACK_SENTINEL;
    ustack[1] = argc;
    ustack[2] = sp.checked_sub((argc + 1) * 4).ok_or_else(overflow)?;

    sp = sp.checked_sub(frame_len).ok_or_else(overflow)?;
    let mut frame = [0_u8; USTACK_WORDS * 4];
    for (dst, word) in frame.chunks_exact_mut(4).zip(&ustack[..words]) {
        dst.copy_from_slice(&word.to_le_bytes());
    }
    space.copy_out(VirtualAddress::new(sp), &frame[..words * 4])?;
    Ok(sp)
}

const fn overflow() -> ExecError {
    ExecError::AddressOverflow
}
