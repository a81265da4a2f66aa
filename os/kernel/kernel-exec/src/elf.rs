//! # ELF32 Image Format
//!
//! Just enough of the 32-bit little-endian ELF format to load a statically
//! linked executable: the file header and the program header table.

use crate::ExecError;
use bitfield_struct::bitfield;

/// `\x7FELF` read as a little-endian word.
pub const ELF_MAGIC: u32 = 0x464C_457F;

/// `p_type` of a loadable segment.
pub const ELF_PROG_LOAD: u32 = 1;

#[inline]
const fn le16(x: &[u8]) -> u16 {
    u16::from_le_bytes([x[0], x[1]])
}

#[inline]
const fn le32(x: &[u8]) -> u32 {
    u32::from_le_bytes([x[0], x[1], x[2], x[3]])
}

/// File header (`Elf32_Ehdr`), 52 bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::struct_field_names)]
pub struct ElfHeader {
    pub e_magic: u32,
    pub e_ident: [u8; 12],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// Program header (`Elf32_Phdr`), 32 bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::struct_field_names)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: PFlags,
    pub p_align: u32,
}

/// `Elf32_Phdr.p_flags`: bit0=X, bit1=W, bit2=R. Recorded, not enforced.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PFlags {
    pub execute: bool,
    pub write: bool,
    pub read: bool,
    #[bits(29)]
    __: u32,
}

impl ElfHeader {
    pub const SIZE: usize = 52;

    /// Decode the raw header. No validation; see [`Self::validate`].
    #[must_use]
    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        let mut e_ident = [0; 12];
        e_ident.copy_from_slice(&bytes[4..16]);
        Self {
            e_magic: le32(&bytes[0..4]),
            e_ident,
            e_type: le16(&bytes[16..18]),
            e_machine: le16(&bytes[18..20]),
            e_version: le32(&bytes[20..24]),
            e_entry: le32(&bytes[24..28]),
            e_phoff: le32(&bytes[28..32]),
            e_shoff: le32(&bytes[32..36]),
            e_flags: le32(&bytes[36..40]),
            e_ehsize: le16(&bytes[40..42]),
            e_phentsize: le16(&bytes[42..44]),
            e_phnum: le16(&bytes[44..46]),
            e_shentsize: le16(&bytes[46..48]),
            e_shnum: le16(&bytes[48..50]),
            e_shstrndx: le16(&bytes[50..52]),
        }
    }

    #[must_use]
    pub const fn has_magic(&self) -> bool {
        self.e_magic == ELF_MAGIC
    }

    /// Check what exec relies on before allocating anything.
    ///
    /// # Errors
    /// - [`ExecError::BadMagic`] if the magic does not match.
    /// - [`ExecError::BadProgramHeaderSize`] if there are program headers and
    ///   their size is not 32 bytes.
    pub const fn validate(&self) -> Result<(), ExecError> {
        if !self.has_magic() {
            return Err(ExecError::BadMagic(self.e_magic));
        }
        if self.e_phnum > 0 && self.e_phentsize as usize != ProgramHeader::SIZE {
            return Err(ExecError::BadProgramHeaderSize(self.e_phentsize));
        }
        Ok(())
    }

    /// File offset of program header `index`, or `None` if it wraps.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn program_header_offset(&self, index: u16) -> Option<u32> {
        self.e_phoff
            .checked_add(index as u32 * ProgramHeader::SIZE as u32)
    }
}

impl ProgramHeader {
    pub const SIZE: usize = 32;

    #[must_use]
    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            p_type: le32(&bytes[0..4]),
            p_offset: le32(&bytes[4..8]),
            p_vaddr: le32(&bytes[8..12]),
            p_paddr: le32(&bytes[12..16]),
            p_filesz: le32(&bytes[16..20]),
            p_memsz: le32(&bytes[20..24]),
            p_flags: PFlags::from_bits(le32(&bytes[24..28])),
            p_align: le32(&bytes[28..32]),
        }
    }

    #[must_use]
    pub const fn is_load(&self) -> bool {
        self.p_type == ELF_PROG_LOAD
    }
}
