//! # Memory Layout

pub use kernel_memory_addresses::{PAGE_SHIFT, PAGE_SIZE};

/// First kernel virtual address; user space ends here.
pub const KERNBASE: u32 = 0x8000_0000;

/// Start of extended memory; the kernel image is loaded here.
pub const EXTMEM: u32 = 0x0010_0000;

/// Address where the kernel is linked.
pub const KERNLINK: u32 = KERNBASE + EXTMEM;

/// Top of physical memory usable by the kernel.
pub const PHYSTOP: u32 = 0x0E00_0000;

/// Memory-mapped devices live above this address.
pub const DEVSPACE: u32 = 0xFE00_0000;

/// Disk sector size; used only by the boot loader.
pub const SECTOR_SIZE: usize = 512;

/// Physical scratch address the boot loader reads the image header into.
pub const BOOT_SCRATCH: u32 = 0x0001_0000;

/// Number of bytes the boot loader reads for the image header.
pub const BOOT_HEADER_BYTES: u32 = PAGE_SIZE;

/// Byte pattern written over every freed page.
pub const POISON_BYTE: u8 = 0x01;

const _: () = {
    assert!(KERNBASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYSTOP <= DEVSPACE - KERNBASE);
    assert!(EXTMEM < PHYSTOP);
    assert!(BOOT_SCRATCH + BOOT_HEADER_BYTES <= EXTMEM);
};
