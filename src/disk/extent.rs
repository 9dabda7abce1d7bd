//! Extent numbering and the arithmetic that maps a byte length onto records,
//! blocks, and directory entries.

use std::fmt;

use crate::disk::geometry::{BLOCKS_PER_EXTENT, BLOCK_SIZE, RECORDS_PER_EXTENT, SECTOR_SIZE};

const EXTENT_LOW_MASK: u8 = 0x1F;
const EXTENT_HIGH_MASK: u8 = 0x3F;
const EXTENT_HIGH_SHIFT: u16 = 5;

/// The position of a directory entry within its file.  On disk this is split
/// across two bytes: the low five bits in byte 12 ("EX") and the next six
/// bits in byte 14 ("S2").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtentNumber(pub u16);

impl ExtentNumber {
    /// The largest extent number the two bytes can hold.
    pub const MAX: ExtentNumber =
        ExtentNumber(((EXTENT_HIGH_MASK as u16) << EXTENT_HIGH_SHIFT) | EXTENT_LOW_MASK as u16);

    /// Combine the low and high extent bytes.  The bytes are used as found,
    /// so stray high bits in a foreign image still contribute.
    #[inline]
    pub fn from_bytes(low: u8, high: u8) -> ExtentNumber {
        ExtentNumber(low as u16 + ((high as u16) << EXTENT_HIGH_SHIFT))
    }

    /// Split this extent number into its (low, high) bytes.
    #[inline]
    pub fn to_bytes(&self) -> (u8, u8) {
        let low = (self.0 as u8) & EXTENT_LOW_MASK;
        let high = ((self.0 >> EXTENT_HIGH_SHIFT) as u8) & EXTENT_HIGH_MASK;
        (low, high)
    }
}

impl fmt::Display for ExtentNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of 128-byte records needed to hold `length` bytes.
#[inline]
pub fn records_for(length: usize) -> usize {
    (length + SECTOR_SIZE - 1) / SECTOR_SIZE
}

/// Number of allocation blocks needed to hold `length` bytes.
#[inline]
pub fn blocks_for(length: usize) -> usize {
    (length + BLOCK_SIZE - 1) / BLOCK_SIZE
}

/// Number of directory entries needed to reference `blocks` blocks.  Even an
/// empty file occupies one entry so that it can be found again.
#[inline]
pub fn extents_for(blocks: usize) -> usize {
    ((blocks + BLOCKS_PER_EXTENT - 1) / BLOCKS_PER_EXTENT).max(1)
}

/// The record count to store in extent `index` of a file holding `records`
/// records in total.
#[inline]
pub fn records_in_extent(records: usize, index: usize) -> u8 {
    records
        .saturating_sub(index * RECORDS_PER_EXTENT)
        .min(RECORDS_PER_EXTENT) as u8
}

/// Total records described by a file's extents, given the number of extents
/// and the record count of the last one.  Every extent but the last is
/// assumed to be full.
#[inline]
pub fn total_records(extents: usize, last_record_count: u8) -> usize {
    match extents {
        0 => 0,
        n => (n - 1) * RECORDS_PER_EXTENT + last_record_count as usize,
    }
}
