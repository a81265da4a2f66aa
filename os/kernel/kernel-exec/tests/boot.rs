mod common;

use common::{Segment, build_image, patch_u32, pattern, ph_field};
use kernel_exec::boot::{SectorDisk, boot_main};
use kernel_info::memory::SECTOR_SIZE;

const MEM_SIZE: usize = 0x20_0000;

/// Disk holding a boot block in sector 0 and `image` from sector 1 on.
struct MemDisk {
    image: Vec<u8>,
    reads: Vec<u32>,
}

impl MemDisk {
    fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            reads: Vec::new(),
        }
    }
}

impl SectorDisk for MemDisk {
    fn read_sector(&mut self, dst: &mut [u8; SECTOR_SIZE], sector: u32) {
        self.reads.push(sector);
        dst.fill(0);
        if sector == 0 {
            return;
        }
        let start = (sector as usize - 1) * SECTOR_SIZE;
        if let Some(src) = self.image.get(start..) {
            let n = src.len().min(SECTOR_SIZE);
            dst[..n].copy_from_slice(&src[..n]);
        }
    }
}

fn kernel_image() -> Vec<u8> {
    let mut text = Segment::load(0x8010_0000, pattern(0x1234, 7), 0x1234);
    text.paddr = 0x0010_0000;
    let mut data = Segment::load(0x8010_2000, pattern(0x300, 9), 0x2000);
    data.paddr = 0x0010_2000;
    build_image(0x0010_000C, &[text, data])
}

#[test]
fn loads_segments_at_physical_addresses() {
    let mut disk = MemDisk::new(kernel_image());
    let mut mem = vec![0xCC_u8; MEM_SIZE];

    assert_eq!(boot_main(&mut disk, &mut mem), Some(0x0010_000C));

    assert_eq!(mem[0x10_0000..0x10_1234], pattern(0x1234, 7)[..]);
    assert_eq!(mem[0x10_2000..0x10_2300], pattern(0x300, 9)[..]);
    // bss of the data segment is cleared.
    assert!(mem[0x10_2300..0x10_4000].iter().all(|&b| b == 0));
    // Far from any segment nothing was touched.
    assert!(mem[0x10_4200..0x10_5000].iter().all(|&b| b == 0xCC));
}

#[test]
fn header_goes_through_scratch_and_skips_boot_block() {
    let mut disk = MemDisk::new(kernel_image());
    let mut mem = vec![0; MEM_SIZE];
    boot_main(&mut disk, &mut mem).unwrap();

    assert_eq!(&mem[0x1_0000..0x1_0004], b"\x7FELF");
    assert!(!disk.reads.contains(&0));
    assert_eq!(disk.reads[..8], [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn bad_magic_returns_none() {
    let mut image = kernel_image();
    image[1] = b'X';
    let mut disk = MemDisk::new(image);
    let mut mem = vec![0xCC; MEM_SIZE];

    assert_eq!(boot_main(&mut disk, &mut mem), None);
    // Only the header was read.
    assert_eq!(disk.reads.len(), 8);
    assert!(mem[0x10_0000..0x10_2000].iter().all(|&b| b == 0xCC));
}

#[test]
fn segment_outside_memory_returns_none() {
    let mut image = kernel_image();
    patch_u32(&mut image, ph_field(1, 12), 0x01F0_0000);
    let mut disk = MemDisk::new(image);
    let mut mem = vec![0; MEM_SIZE];
    assert_eq!(boot_main(&mut disk, &mut mem), None);
}

#[test]
fn memory_too_small_for_scratch_returns_none() {
    let mut disk = MemDisk::new(kernel_image());
    let mut mem = vec![0; 0x1_0000];
    assert_eq!(boot_main(&mut disk, &mut mem), None);
}
