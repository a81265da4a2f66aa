#![allow(dead_code)]

use kernel_alloc::PagePool;
use kernel_exec::fs::{FileSystem, Inode};
use kernel_info::layout::MemoryLayout;
use kernel_info::memory::{EXTMEM, PAGE_SIZE};
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::{Mmu, ReadAt};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const PAGE: usize = PAGE_SIZE as usize;

/// Page-aligned heap block standing in for physical memory `[0, size)`.
pub struct Arena {
    ptr: *mut u8,
    size: usize,
    layout: MemoryLayout,
}

impl Arena {
    pub fn new(size: usize) -> Self {
        let alloc_layout = Layout::from_size_align(size, PAGE).unwrap();
        let ptr = unsafe { alloc_zeroed(alloc_layout) };
        assert!(!ptr.is_null());
        let base = ptr.expose_provenance();
        let text_end = base + EXTMEM as usize + 2 * PAGE;
        let end = text_end + 2 * PAGE;
        let phys_top = PhysicalAddress::new(u32::try_from(size).unwrap());
        let layout = MemoryLayout::new(base, text_end, end, phys_top);
        Self { ptr, size, layout }
    }

    pub fn pool(&self) -> PagePool {
        let pool = PagePool::new();
        let end = self.layout.kernel_end();
        let top = self.layout.direct_map_base() + self.size;
        unsafe {
            pool.init_phase1(self.layout, end, end + 8 * PAGE);
            pool.init_phase2(end + 8 * PAGE, top);
        }
        pool
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let alloc_layout = Layout::from_size_align(self.size, PAGE).unwrap();
        unsafe { dealloc(self.ptr, alloc_layout) };
    }
}

/// Filesystem calls in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsEvent {
    BeginOp,
    EndOp,
    Namei(Vec<u8>),
    Lock,
    UnlockPut,
}

/// In-memory filesystem recording every call.
#[derive(Default)]
pub struct MemFs {
    files: HashMap<Vec<u8>, Rc<[u8]>>,
    events: Rc<RefCell<Vec<FsEvent>>>,
}

pub struct MemInode {
    data: Rc<[u8]>,
    locked: bool,
    events: Rc<RefCell<Vec<FsEvent>>>,
}

impl MemFs {
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(path.as_bytes().to_vec(), data.into());
        self
    }

    pub fn events(&self) -> Vec<FsEvent> {
        self.events.borrow().clone()
    }

    /// Events other than the lookup itself.
    pub fn protocol(&self) -> Vec<FsEvent> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, FsEvent::Namei(_)))
            .collect()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }
}

impl FileSystem for MemFs {
    type Inode = MemInode;

    fn begin_op(&self) {
        self.events.borrow_mut().push(FsEvent::BeginOp);
    }

    fn end_op(&self) {
        self.events.borrow_mut().push(FsEvent::EndOp);
    }

    fn namei(&self, path: &[u8]) -> Option<MemInode> {
        self.events.borrow_mut().push(FsEvent::Namei(path.to_vec()));
        let data = self.files.get(path)?;
        Some(MemInode {
            data: Rc::clone(data),
            locked: false,
            events: Rc::clone(&self.events),
        })
    }
}

impl ReadAt for MemInode {
    fn read_at(&mut self, dst: &mut [u8], offset: u32) -> usize {
        assert!(self.locked, "read from an unlocked inode");
        let mut src: &[u8] = &self.data;
        src.read_at(dst, offset)
    }
}

impl Inode for MemInode {
    fn lock(&mut self) {
        assert!(!self.locked);
        self.locked = true;
        self.events.borrow_mut().push(FsEvent::Lock);
    }

    fn unlock_put(self) {
        assert!(self.locked);
        self.events.borrow_mut().push(FsEvent::UnlockPut);
    }
}

/// MMU double remembering every activated directory.
#[derive(Default)]
pub struct RecordingMmu {
    pub switched: RefCell<Vec<PhysicalAddress>>,
}

impl Mmu for RecordingMmu {
    fn switch_uvm(&self, root: PhysicalAddress) {
        self.switched.borrow_mut().push(root);
    }
}

/// One program header for [`build_image`].
pub struct Segment {
    pub p_type: u32,
    pub vaddr: u32,
    pub paddr: u32,
    pub data: Vec<u8>,
    pub memsz: u32,
}

impl Segment {
    pub fn load(vaddr: u32, data: Vec<u8>, memsz: u32) -> Self {
        Self {
            p_type: 1,
            vaddr,
            paddr: vaddr,
            data,
            memsz,
        }
    }
}

pub const PH_TABLE: usize = 52;
pub const DATA_START: usize = 0x1000;

/// A little-endian ELF32 executable: header, program header table right
/// after it, segment contents from [`DATA_START`] on, each sector-aligned.
pub fn build_image(entry: u32, segments: &[Segment]) -> Vec<u8> {
    let mut image = vec![0u8; DATA_START];
    image[0..4].copy_from_slice(b"\x7FELF");
    image[4] = 1; // 32-bit
    image[5] = 1; // little-endian
    image[6] = 1;
    image[16..18].copy_from_slice(&2u16.to_le_bytes());
    image[18..20].copy_from_slice(&3u16.to_le_bytes());
    image[20..24].copy_from_slice(&1u32.to_le_bytes());
    image[24..28].copy_from_slice(&entry.to_le_bytes());
    image[28..32].copy_from_slice(&u32::try_from(PH_TABLE).unwrap().to_le_bytes());
    image[40..42].copy_from_slice(&52u16.to_le_bytes());
    image[42..44].copy_from_slice(&32u16.to_le_bytes());
    image[44..46].copy_from_slice(&u16::try_from(segments.len()).unwrap().to_le_bytes());

    for (i, seg) in segments.iter().enumerate() {
        let offset = image.len();
        image.extend_from_slice(&seg.data);
        image.resize(image.len().next_multiple_of(512), 0);

        let ph = &mut image[PH_TABLE + i * 32..PH_TABLE + (i + 1) * 32];
        ph[0..4].copy_from_slice(&seg.p_type.to_le_bytes());
        ph[4..8].copy_from_slice(&u32::try_from(offset).unwrap().to_le_bytes());
        ph[8..12].copy_from_slice(&seg.vaddr.to_le_bytes());
        ph[12..16].copy_from_slice(&seg.paddr.to_le_bytes());
        ph[16..20].copy_from_slice(&u32::try_from(seg.data.len()).unwrap().to_le_bytes());
        ph[20..24].copy_from_slice(&seg.memsz.to_le_bytes());
        ph[24..28].copy_from_slice(&5u32.to_le_bytes());
        ph[28..32].copy_from_slice(&0x1000u32.to_le_bytes());
    }
    image
}

/// Overwrite a little-endian `u32` inside `image`.
pub fn patch_u32(image: &mut [u8], at: usize, value: u32) {
    image[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Overwrite a little-endian `u16` inside `image`.
pub fn patch_u16(image: &mut [u8], at: usize, value: u16) {
    image[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// Byte offset of field `field_offset` in program header `index`.
pub const fn ph_field(index: usize, field_offset: usize) -> usize {
    PH_TABLE + index * 32 + field_offset
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..=u8::MAX)
        .cycle()
        .take(len)
        .map(|i| i.wrapping_mul(31).wrapping_add(seed))
        .collect()
}
