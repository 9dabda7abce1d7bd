//! Block and directory slot allocation.
//!
//! CP/M keeps no allocation bitmap on disk.  The directory is the only record
//! of which blocks are in use, so every query here re-derives the allocation
//! state by scanning all occupied entries.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use crate::disk::directory::{slot_status, DirectoryIterator, SlotStatus};
use crate::disk::geometry::{allocatable_blocks, DIR_ENTRIES};
use crate::disk::image::Image;

/// A snapshot of which blocks are referenced by occupied directory entries.
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationMap {
    used: BTreeSet<u16>,
}

impl AllocationMap {
    /// Scan the directory of `image` and record every block it references.
    pub fn read(image: &Image) -> AllocationMap {
        let used = DirectoryIterator::new(image)
            .flat_map(|(_, entry)| entry.blocks.into_iter())
            .collect();
        AllocationMap { used }
    }

    #[inline]
    pub fn is_allocated(&self, block: u16) -> bool {
        self.used.contains(&block)
    }

    /// Every block number referenced by the directory, including any that are
    /// out of range.
    pub fn allocated_blocks(&self) -> &BTreeSet<u16> {
        &self.used
    }

    /// Return up to `count` unreferenced blocks, lowest first.  Fewer are
    /// returned if the disk doesn't have enough.
    pub fn next_free_blocks(&self, count: usize) -> Vec<u16> {
        allocatable_blocks()
            .filter(|block| !self.is_allocated(*block))
            .take(count)
            .collect()
    }

    /// Return the number of blocks that could still be allocated.
    pub fn blocks_free(&self) -> usize {
        allocatable_blocks()
            .filter(|block| !self.is_allocated(*block))
            .count()
    }
}

impl fmt::Display for AllocationMap {
    /// Draw one character per allocatable block, sixteen to a row: '*' for
    /// allocated and '.' for free.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const COLUMNS: u16 = 16;
        let range = allocatable_blocks();
        let mut row_start = range.start - range.start % COLUMNS;
        while row_start < range.end {
            write!(f, "{:3}: ", row_start)?;
            for block in row_start..row_start + COLUMNS {
                let c = if !range.contains(&block) {
                    ' '
                } else if self.is_allocated(block) {
                    '*'
                } else {
                    '.'
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
            row_start += COLUMNS;
        }
        Ok(())
    }
}

/// Return the set of blocks referenced by any occupied directory entry.
pub fn used_blocks(image: &Image) -> BTreeSet<u16> {
    AllocationMap::read(image).used
}

/// Return up to `count` free blocks in ascending order.  The caller must
/// check the length of the result against its request.
pub fn find_free_blocks(image: &Image, count: usize) -> Vec<u16> {
    AllocationMap::read(image).next_free_blocks(count)
}

/// Return the first empty directory slot, if any.
pub fn find_free_slot(image: &Image) -> io::Result<Option<usize>> {
    Ok(free_slots(image, 1)?.into_iter().next())
}

/// Return up to `count` empty directory slots in ascending order.
pub fn free_slots(image: &Image, count: usize) -> io::Result<Vec<usize>> {
    let mut slots = Vec::with_capacity(count);
    for slot in 0..DIR_ENTRIES {
        if slots.len() == count {
            break;
        }
        if slot_status(image, slot)? == SlotStatus::Empty {
            slots.push(slot);
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::directory::{clear_directory, write_entry, DirectoryEntry};
    use crate::disk::extent::ExtentNumber;
    use crate::disk::filename::FileName;
    use crate::disk::geometry::TOTAL_BLOCKS;

    fn blank_image() -> Image {
        let mut image = Image::open_memory();
        clear_directory(&mut image);
        image
    }

    fn put_entry(image: &mut Image, slot: usize, user: u8, blocks: &[u16]) {
        let mut entry = DirectoryEntry::new(user, FileName::parse("F").unwrap(), ExtentNumber(0));
        entry.blocks = blocks.to_vec();
        write_entry(image, slot, &entry).unwrap();
    }

    #[test]
    fn test_blank_image() {
        let image = blank_image();
        assert!(used_blocks(&image).is_empty());
        assert_eq!(find_free_blocks(&image, 3), vec![2, 3, 4]);
        assert_eq!(find_free_slot(&image).unwrap(), Some(0));
        assert_eq!(AllocationMap::read(&image).blocks_free(), TOTAL_BLOCKS - 2);
    }

    #[test]
    fn test_first_fit() {
        let mut image = blank_image();
        put_entry(&mut image, 0, 0, &[2, 3, 5]);
        put_entry(&mut image, 2, 7, &[6]);
        let used: Vec<u16> = used_blocks(&image).into_iter().collect();
        assert_eq!(used, vec![2, 3, 5, 6]);
        assert_eq!(find_free_blocks(&image, 3), vec![4, 7, 8]);
        assert_eq!(find_free_slot(&image).unwrap(), Some(1));
        assert_eq!(free_slots(&image, 3).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn test_ignores_unoccupied_slots() {
        let mut image = blank_image();
        // A deleted entry keeps its block map, but its blocks are free.
        put_entry(&mut image, 0, 0xE5, &[2, 3]);
        put_entry(&mut image, 1, 0x21, &[4]);
        assert!(used_blocks(&image).is_empty());
        assert_eq!(find_free_blocks(&image, 1), vec![2]);
        // Invalid slots are not free for reuse either.
        assert_eq!(find_free_slot(&image).unwrap(), Some(0));
        assert_eq!(free_slots(&image, 2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_short_result_when_full() {
        let mut image = blank_image();
        let all: Vec<u16> = allocatable_blocks().collect();
        for (slot, chunk) in all.chunks(16).enumerate() {
            put_entry(&mut image, slot, 0, chunk);
        }
        assert!(find_free_blocks(&image, 1).is_empty());
        assert_eq!(AllocationMap::read(&image).blocks_free(), 0);

        let mut image = blank_image();
        for (slot, chunk) in all[..all.len() - 2].chunks(16).enumerate() {
            put_entry(&mut image, slot, 0, chunk);
        }
        assert_eq!(find_free_blocks(&image, 5), vec![245, 246]);
    }

    #[test]
    fn test_directory_full() {
        let mut image = blank_image();
        for slot in 0..DIR_ENTRIES {
            put_entry(&mut image, slot, 0, &[]);
        }
        assert_eq!(find_free_slot(&image).unwrap(), None);
        assert!(free_slots(&image, 4).unwrap().is_empty());
    }

    #[test]
    fn test_display() {
        let mut image = blank_image();
        put_entry(&mut image, 0, 0, &[2, 4]);
        let map = AllocationMap::read(&image).to_string();
        let first = map.lines().next().unwrap();
        assert_eq!(first, format!("  0:   *.*{}", ".".repeat(11)));
        assert_eq!(map.lines().count(), 16);
    }
}
