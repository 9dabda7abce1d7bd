//! CP/M directory entries

use std::fmt;
use std::io;

use crate::disk::error::DiskError;
use crate::disk::extent::ExtentNumber;
use crate::disk::filename::{FileName, EXTENSION_SIZE, NAME_SIZE};
use crate::disk::geometry::{entry_offset, BLOCKS_PER_EXTENT, DIR_ENTRIES, ENTRY_SIZE};
use crate::disk::image::Image;

/// A status byte of 0xE5 marks a slot as never used or deleted.  Freshly
/// formatted media is filled with this value.
pub const EMPTY_ENTRY: u8 = 0xE5;
/// User numbers 0 through 15 are valid.
pub const MAX_USER: u8 = 15;

const ENTRY_STATUS_OFFSET: usize = 0x00;
const ENTRY_NAME_OFFSET: usize = 0x01;
const ENTRY_EXTENSION_OFFSET: usize = ENTRY_NAME_OFFSET + NAME_SIZE;
const ENTRY_EXTENT_LOW_OFFSET: usize = 0x0C;
const ENTRY_RESERVED_OFFSET: usize = 0x0D;
const ENTRY_EXTENT_HIGH_OFFSET: usize = 0x0E;
const ENTRY_RECORD_COUNT_OFFSET: usize = 0x0F;
const ENTRY_BLOCKS_OFFSET: usize = 0x10;

/// The interpretation of a directory slot's first byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    /// The slot is free for use.
    Empty,
    /// The slot holds an extent belonging to the given user number.
    Occupied(u8),
    /// Anything else (e.g. CP/M 3 labels and timestamps).  These slots are
    /// neither listed nor reused.
    Invalid(u8),
}

impl SlotStatus {
    pub fn from_byte(byte: u8) -> SlotStatus {
        match byte {
            EMPTY_ENTRY => SlotStatus::Empty,
            user if user <= MAX_USER => SlotStatus::Occupied(user),
            other => SlotStatus::Invalid(other),
        }
    }
}

/// A single 32-byte directory entry, describing one extent of a file.
#[derive(Clone, PartialEq)]
pub struct DirectoryEntry {
    pub user: u8,
    pub filename: FileName,
    pub extent: ExtentNumber,
    /// Byte 13 ("S1").  Unused by CP/M 2.2, but preserved.
    pub reserved: u8,
    /// Number of 128-byte records used in this extent.
    pub record_count: u8,
    /// Allocated block numbers in slot order, with unused (zero) slots
    /// omitted.
    pub blocks: Vec<u16>,
    /// The directory slot where this entry is stored, if known.
    pub slot: Option<usize>,
}

impl DirectoryEntry {
    pub fn new(user: u8, filename: FileName, extent: ExtentNumber) -> DirectoryEntry {
        DirectoryEntry {
            user,
            filename,
            extent,
            reserved: 0,
            record_count: 0,
            blocks: vec![],
            slot: None,
        }
    }

    /// Decode a 32-byte directory entry.  The status byte is taken as the user
    /// number without checking whether the slot is actually in use.
    pub fn from_bytes(bytes: &[u8]) -> DirectoryEntry {
        assert_eq!(bytes.len(), ENTRY_SIZE);
        let filename = FileName::from_fields(
            &bytes[ENTRY_NAME_OFFSET..ENTRY_NAME_OFFSET + NAME_SIZE],
            &bytes[ENTRY_EXTENSION_OFFSET..ENTRY_EXTENSION_OFFSET + EXTENSION_SIZE],
        );
        let blocks = bytes[ENTRY_BLOCKS_OFFSET..ENTRY_BLOCKS_OFFSET + BLOCKS_PER_EXTENT]
            .iter()
            .filter(|&&b| b != 0)
            .map(|&b| b as u16)
            .collect();
        DirectoryEntry {
            user: bytes[ENTRY_STATUS_OFFSET],
            filename,
            extent: ExtentNumber::from_bytes(
                bytes[ENTRY_EXTENT_LOW_OFFSET],
                bytes[ENTRY_EXTENT_HIGH_OFFSET],
            ),
            reserved: bytes[ENTRY_RESERVED_OFFSET],
            record_count: bytes[ENTRY_RECORD_COUNT_OFFSET],
            blocks,
            slot: None,
        }
    }

    fn from_slot_bytes(bytes: &[u8], slot: usize) -> DirectoryEntry {
        let mut entry = Self::from_bytes(bytes);
        entry.slot = Some(slot);
        entry
    }

    /// Encode this entry into a 32-byte buffer.  Every byte of the buffer is
    /// written.
    pub fn to_bytes(&self, bytes: &mut [u8]) {
        assert_eq!(bytes.len(), ENTRY_SIZE);
        assert!(self.blocks.len() <= BLOCKS_PER_EXTENT);
        bytes[ENTRY_STATUS_OFFSET] = self.user;
        self.filename
            .to_bytes(&mut bytes[ENTRY_NAME_OFFSET..ENTRY_EXTENT_LOW_OFFSET]);
        let (low, high) = self.extent.to_bytes();
        bytes[ENTRY_EXTENT_LOW_OFFSET] = low;
        bytes[ENTRY_RESERVED_OFFSET] = self.reserved;
        bytes[ENTRY_EXTENT_HIGH_OFFSET] = high;
        bytes[ENTRY_RECORD_COUNT_OFFSET] = self.record_count;
        let map = &mut bytes[ENTRY_BLOCKS_OFFSET..ENTRY_BLOCKS_OFFSET + BLOCKS_PER_EXTENT];
        for b in map.iter_mut() {
            *b = 0;
        }
        for (dst, &block) in map.iter_mut().zip(self.blocks.iter()) {
            // Block numbers are single bytes with this geometry.
            *dst = block as u8;
        }
    }
}

impl fmt::Display for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<2} {:<12} ext {:<4} {:>3} rec",
            self.user, self.filename, self.extent, self.record_count
        )?;
        if f.alternate() {
            // verbose
            write!(f, " blocks {:?}", self.blocks)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{:?},ext={},rec={},blocks={:?} @ {:?}",
            self.user, self.filename, self.extent, self.record_count, self.blocks, self.slot
        )
    }
}

/// Return the raw bytes of a directory slot.
pub fn slot_bytes(image: &Image, slot: usize) -> io::Result<&[u8]> {
    if slot >= DIR_ENTRIES {
        return Err(DiskError::InvalidSlot.into());
    }
    image.slice(entry_offset(slot), ENTRY_SIZE)
}

/// Return the status of a directory slot.
pub fn slot_status(image: &Image, slot: usize) -> io::Result<SlotStatus> {
    Ok(SlotStatus::from_byte(slot_bytes(image, slot)?[ENTRY_STATUS_OFFSET]))
}

/// Encode `entry` into directory slot `slot`.
pub fn write_entry(image: &mut Image, slot: usize, entry: &DirectoryEntry) -> io::Result<()> {
    if slot >= DIR_ENTRIES {
        return Err(DiskError::InvalidSlot.into());
    }
    let bytes = image.slice_mut(entry_offset(slot), ENTRY_SIZE)?;
    entry.to_bytes(bytes);
    Ok(())
}

/// Mark every directory slot as empty.  Only the status bytes are touched.
pub fn clear_directory(image: &mut Image) {
    let bytes = image.as_bytes_mut();
    for slot in 0..DIR_ENTRIES {
        bytes[entry_offset(slot) + ENTRY_STATUS_OFFSET] = EMPTY_ENTRY;
    }
}

/// This iterator walks the fixed directory region of an image and returns
/// each occupied entry along with its slot index.  Empty and invalid slots
/// are skipped.
pub struct DirectoryIterator<'a> {
    image: &'a Image,
    slot: usize,
}

impl<'a> DirectoryIterator<'a> {
    pub fn new(image: &'a Image) -> DirectoryIterator<'a> {
        DirectoryIterator { image, slot: 0 }
    }
}

impl<'a> Iterator for DirectoryIterator<'a> {
    type Item = (usize, DirectoryEntry);

    fn next(&mut self) -> Option<(usize, DirectoryEntry)> {
        while self.slot < DIR_ENTRIES {
            let slot = self.slot;
            self.slot += 1;
            let bytes = match slot_bytes(self.image, slot) {
                Ok(bytes) => bytes,
                Err(_) => return None,
            };
            if let SlotStatus::Occupied(_) = SlotStatus::from_byte(bytes[ENTRY_STATUS_OFFSET]) {
                return Some((slot, DirectoryEntry::from_slot_bytes(bytes, slot)));
            }
        }
        None
    }
}
