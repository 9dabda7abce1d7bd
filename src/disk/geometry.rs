//! The fixed 8" single-density geometry used by CP/M 2.2 disk images: 77
//! tracks of 26 sectors, 128 bytes per sector, with the first two tracks
//! reserved for the system.

/// Total size of a disk image in bytes.
pub const DISK_SIZE: usize = 256 * 1024;
/// Size of a CP/M sector, which is also the size of one logical record.
pub const SECTOR_SIZE: usize = 128;
pub const SECTORS_PER_TRACK: usize = 26;
pub const TRACKS: usize = 77;
/// Tracks holding the boot loader and system image.
pub const RESERVED_TRACKS: usize = 2;
/// Size of an allocation block.
pub const BLOCK_SIZE: usize = 1024;
/// Number of slots in the directory region.
pub const DIR_ENTRIES: usize = 64;
/// Size of one directory entry.
pub const ENTRY_SIZE: usize = 32;

/// Byte offset of the first directory entry.
pub const DIR_OFFSET: usize = RESERVED_TRACKS * SECTORS_PER_TRACK * SECTOR_SIZE;
/// Byte offset of the data region.  Block 2 begins here.
pub const DATA_OFFSET: usize = DIR_OFFSET + DIR_ENTRIES * ENTRY_SIZE;
/// Number of whole allocation blocks that fit in the data region.
pub const TOTAL_BLOCKS: usize = (DISK_SIZE - DATA_OFFSET) / BLOCK_SIZE;

/// Block numbers 0 and 1 cover the directory and are never handed out.
pub const FIRST_DATA_BLOCK: u16 = 2;

/// Records addressed by one directory entry.
pub const RECORDS_PER_EXTENT: usize = 128;
/// Block pointers held by one directory entry.
pub const BLOCKS_PER_EXTENT: usize = 16;

/// Return the image byte offset of the directory slot `slot`.
#[inline]
pub fn entry_offset(slot: usize) -> usize {
    DIR_OFFSET + slot * ENTRY_SIZE
}

/// Return the image byte offset of allocation block `block`, or `None` if the
/// block number does not name a complete block inside the data region.
#[inline]
pub fn block_offset(block: u16) -> Option<usize> {
    if block < FIRST_DATA_BLOCK {
        return None;
    }
    let offset = DATA_OFFSET + (block - FIRST_DATA_BLOCK) as usize * BLOCK_SIZE;
    if offset + BLOCK_SIZE > DISK_SIZE {
        None
    } else {
        Some(offset)
    }
}

/// Return the range of block numbers the allocator may hand out, in the order
/// they are tried.
#[inline]
pub fn allocatable_blocks() -> ::std::ops::Range<u16> {
    FIRST_DATA_BLOCK..TOTAL_BLOCKS as u16
}
