use kernel_memory_addresses::VirtualAddress;
use kernel_vmem::VmError;

/// Why an exec attempt failed. The calling process is unchanged in every case.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("no such file")]
    NotFound,
    #[error("short read of image header")]
    ShortRead,
    #[error("bad ELF magic {0:#010x}")]
    BadMagic(u32),
    #[error("program header entry size {0}, expected 32")]
    BadProgramHeaderSize(u16),
    #[error("segment memory size {memsz:#x} is smaller than its file size {filesz:#x}")]
    SegmentTruncated { filesz: u32, memsz: u32 },
    #[error("address computation overflows")]
    AddressOverflow,
    #[error("segment address {0} is not page-aligned")]
    UnalignedSegment(VirtualAddress),
    #[error("too many arguments")]
    TooManyArgs,
    #[error(transparent)]
    Vm(#[from] VmError),
}
