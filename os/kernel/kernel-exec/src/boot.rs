//! # Flat Boot Loader
//!
//! Second stage of booting: load the kernel ELF image from the disk into
//! physical memory and report its entry point. Paging is off at this stage,
//! so segments go to their *physical* addresses (`p_paddr`).
//!
//! The image starts at disk sector 1; sector 0 holds the boot block.

use crate::elf::{ElfHeader, ProgramHeader};
use kernel_info::memory::{BOOT_HEADER_BYTES, BOOT_SCRATCH, SECTOR_SIZE};

#[allow(clippy::cast_possible_truncation)]
const SECTOR: u32 = SECTOR_SIZE as u32;

/// Sector-addressed disk.
pub trait SectorDisk {
    /// Read disk sector `sector` into `dst`.
    fn read_sector(&mut self, dst: &mut [u8; SECTOR_SIZE], sector: u32);
}

/// Read `count` bytes starting at image byte `offset` into physical memory
/// at `pa`.
///
/// Whole sectors are transferred, so up to a sector before `pa` and after
/// `pa + count` may be overwritten too. `None` if the transfer leaves `mem`.
fn read_segment<D: SectorDisk + ?Sized>(
    disk: &mut D,
    mem: &mut [u8],
    pa: u32,
    count: u32,
    offset: u32,
) -> Option<()> {
    let end = pa.checked_add(count)?;
    let mut pa = pa.checked_sub(offset % SECTOR)?;
    let mut sector = offset / SECTOR + 1;
    while pa < end {
        let dst: &mut [u8; SECTOR_SIZE] = mem.get_mut(pa as usize..)?.first_chunk_mut()?;
        disk.read_sector(dst, sector);
        pa = pa.checked_add(SECTOR)?;
        sector += 1;
    }
    Some(())
}

/// Load the kernel image from `disk` into `mem` (physical memory from
/// address zero) and return its entry point.
///
/// Returns `None` if the image is not ELF or does not fit in `mem`; the
/// caller then hands control back to the firmware.
pub fn boot_main<D: SectorDisk + ?Sized>(disk: &mut D, mem: &mut [u8]) -> Option<u32> {
    read_segment(disk, mem, BOOT_SCRATCH, BOOT_HEADER_BYTES, 0)?;

    let scratch = BOOT_SCRATCH as usize;
    let header: &[u8; ElfHeader::SIZE] = mem.get(scratch..)?.first_chunk()?;
    let elf = ElfHeader::parse(header);
    if !elf.has_magic() {
        log::warn!("boot: bad magic {:#010x}", elf.e_magic);
        return None;
    }

    for i in 0..elf.e_phnum {
        // The table must lie inside the header bytes already read.
        let off = elf.program_header_offset(i)? as usize;
        if off + ProgramHeader::SIZE > BOOT_HEADER_BYTES as usize {
            return None;
        }
        let raw: &[u8; ProgramHeader::SIZE] = mem.get(scratch + off..)?.first_chunk()?;
        let ph = ProgramHeader::parse(raw);

        read_segment(disk, mem, ph.p_paddr, ph.p_filesz, ph.p_offset)?;
        if ph.p_memsz > ph.p_filesz {
            let bss = ph.p_paddr.checked_add(ph.p_filesz)? as usize;
            let len = (ph.p_memsz - ph.p_filesz) as usize;
            mem.get_mut(bss..bss.checked_add(len)?)?.fill(0);
        }
    }
    Some(elf.e_entry)
}
