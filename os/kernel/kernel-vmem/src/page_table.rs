//! # Page Directory / Page Table page

use crate::PageEntryBits;
use kernel_memory_addresses::ENTRIES_PER_TABLE;

/// One 4 KiB paging structure: 1024 entries.
///
/// The same type serves as the page directory (indexed by VA bits `[31:22]`)
/// and as a page table (indexed by VA bits `[21:12]`).
#[doc(alias = "PT")]
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageTable {
    pub(crate) entries: [PageEntryBits; ENTRIES_PER_TABLE],
}

impl PageTable {
    #[inline]
    #[must_use]
    pub const fn get(&self, index: usize) -> PageEntryBits {
        self.entries[index]
    }

    /// Iterate over present entries with their index.
    pub fn present_entries(&self) -> impl Iterator<Item = (usize, PageEntryBits)> + '_ {
        self.entries
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, e)| e.present())
    }
}

const _: () = assert!(size_of::<PageTable>() == 4096);
