//! CP/M files
//!
//! A file has no record of its own.  It is the set of occupied directory
//! entries sharing a user number, name, and extension, each entry (an
//! "extent") covering up to sixteen blocks and 128 records of the byte stream.
//! Files are written whole and read whole.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use slog::Logger;

use crate::disk::allocation::{free_slots, AllocationMap};
use crate::disk::directory::{write_entry, DirectoryEntry, DirectoryIterator};
use crate::disk::error::DiskError;
use crate::disk::extent::{self, ExtentNumber};
use crate::disk::filename::FileName;
use crate::disk::geometry::{block_offset, BLOCKS_PER_EXTENT, BLOCK_SIZE, SECTOR_SIZE};
use crate::disk::image::Image;

/// The CP/M end-of-file marker (^Z).  Unused space at the end of a file's last
/// block is filled with it, and it is trimmed from the end of files on read.
pub const EOF_BYTE: u8 = 0x1A;

/// Files are always written under user 0.
pub const DEFAULT_USER: u8 = 0;

/// Write `data` to the image as a new file named `filename`, returning the
/// number of bytes written.
///
/// All blocks and directory slots are found before anything is modified, so
/// a failure leaves the image untouched.  Storing a name that already exists
/// adds a second, independent set of extents under the same name.
pub fn store(
    image: &mut Image,
    filename: &FileName,
    data: &[u8],
    logger: &Logger,
) -> io::Result<usize> {
    let records = extent::records_for(data.len());
    let blocks_needed = extent::blocks_for(data.len());
    let extents_needed = extent::extents_for(blocks_needed);
    if extents_needed - 1 > ExtentNumber::MAX.0 as usize {
        return Err(DiskError::FileTooLarge.into());
    }

    let blocks = AllocationMap::read(image).next_free_blocks(blocks_needed);
    if blocks.len() < blocks_needed {
        slog::warn!(logger, "not enough space";
            "file" => %filename, "needed" => blocks_needed, "free" => blocks.len());
        return Err(DiskError::InsufficientSpace.into());
    }
    let slots = free_slots(image, extents_needed)?;
    if slots.len() < extents_needed {
        slog::warn!(logger, "not enough directory entries";
            "file" => %filename, "needed" => extents_needed, "free" => slots.len());
        return Err(DiskError::DirectoryFull.into());
    }

    // Copy the data into its blocks, padding the last one.
    for (chunk, &block) in data.chunks(BLOCK_SIZE).zip(blocks.iter()) {
        let offset = block_offset(block).ok_or_else(|| DiskError::InvalidBlock.to_io_error())?;
        let destination = image.slice_mut(offset, BLOCK_SIZE)?;
        destination[..chunk.len()].copy_from_slice(chunk);
        for b in destination[chunk.len()..].iter_mut() {
            *b = EOF_BYTE;
        }
    }

    // An empty file still gets one entry with no blocks.
    let groups: Vec<&[u16]> = if blocks.is_empty() {
        vec![&blocks[..]]
    } else {
        blocks.chunks(BLOCKS_PER_EXTENT).collect()
    };
    for (index, (group, &slot)) in groups.iter().zip(slots.iter()).enumerate() {
        let mut entry = DirectoryEntry::new(DEFAULT_USER, *filename, ExtentNumber(index as u16));
        entry.record_count = extent::records_in_extent(records, index);
        entry.blocks = group.to_vec();
        write_entry(image, slot, &entry)?;
        slog::trace!(logger, "wrote extent"; "file" => %filename, "extent" => index,
            "slot" => slot, "records" => entry.record_count);
    }

    slog::debug!(logger, "stored file";
        "file" => %filename,
        "bytes" => data.len(),
        "records" => records,
        "blocks" => blocks_needed,
        "extents" => extents_needed);
    Ok(data.len())
}

/// Read the file named `filename` back out of the image.
pub fn retrieve(image: &Image, filename: &FileName, logger: &Logger) -> io::Result<Vec<u8>> {
    let file = File::open(image, filename)?;
    let contents = file.contents(image)?;
    slog::debug!(logger, "retrieved file";
        "file" => %filename, "bytes" => contents.len(), "extents" => file.extents().len());
    Ok(contents)
}

/// A file opened from a disk image: every extent found under its name,
/// ordered by extent number.
#[derive(Clone, Debug)]
pub struct File {
    filename: FileName,
    extents: Vec<DirectoryEntry>,
}

impl File {
    /// Collect the extents of `filename`.  Entries of every user number match.
    pub fn open(image: &Image, filename: &FileName) -> io::Result<File> {
        let mut extents: Vec<DirectoryEntry> = DirectoryIterator::new(image)
            .map(|(_, entry)| entry)
            .filter(|entry| entry.filename == *filename)
            .collect();
        if extents.is_empty() {
            return Err(DiskError::NotFound.into());
        }
        extents.sort_by_key(|entry| entry.extent);
        Ok(File {
            filename: *filename,
            extents,
        })
    }

    pub fn name(&self) -> &FileName {
        &self.filename
    }

    /// Return the directory entries of this file in extent order.
    pub fn extents(&self) -> &[DirectoryEntry] {
        &self.extents
    }

    /// Return the blocks of this file in the order they are read.
    pub fn occupied_blocks(&self) -> Vec<u16> {
        self.extents
            .iter()
            .flat_map(|entry| entry.blocks.iter().cloned())
            .collect()
    }

    /// The number of records implied by the extents, assuming all but the
    /// last are full.
    pub fn record_count(&self) -> usize {
        match self.extents.last() {
            Some(last) => extent::total_records(self.extents.len(), last.record_count),
            None => 0,
        }
    }

    /// Reassemble the file contents.  The data is cut to the recorded length
    /// and then trailing EOF bytes are removed.  This also removes any EOF
    /// bytes that were genuinely part of the file, since the format keeps no
    /// exact byte length.
    pub fn contents(&self, image: &Image) -> io::Result<Vec<u8>> {
        let blocks = self.occupied_blocks();
        let mut data = Vec::with_capacity(blocks.len() * BLOCK_SIZE);
        for block in blocks {
            let offset =
                block_offset(block).ok_or_else(|| DiskError::InvalidBlock.to_io_error())?;
            data.extend_from_slice(image.slice(offset, BLOCK_SIZE)?);
        }
        data.truncate(self.record_count() * SECTOR_SIZE);
        let end = data
            .iter()
            .rposition(|&b| b != EOF_BYTE)
            .map_or(0, |p| p + 1);
        data.truncate(end);
        Ok(data)
    }

    /// Write debug-level information about the file to the provided writer.
    pub fn details(&self, writer: &mut dyn Write) -> io::Result<()> {
        for entry in self.extents.iter() {
            writeln!(writer, "    {:#}", entry)?;
            if let Some(slot) = entry.slot {
                writeln!(writer, "      directory slot: {}", slot)?;
            }
        }
        Ok(())
    }
}

/// A directory listing line: the aggregate of all extents sharing a user
/// number and filename.
#[derive(Clone, Debug, PartialEq)]
pub struct FileSummary {
    pub user: u8,
    pub filename: FileName,
    pub extents: usize,
    /// Sum of the record counts of all extents.
    pub records: usize,
    /// Number of blocks referenced by all extents.
    pub blocks: usize,
}

impl FileSummary {
    /// The file size in bytes, at record granularity.
    pub fn size(&self) -> usize {
        self.records * SECTOR_SIZE
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<5} {:<12} {:>6} bytes  {} blocks",
            self.user,
            self.filename,
            self.size(),
            self.blocks
        )
    }
}

/// Summarize every file in the directory, ordered by user number and then
/// filename.
pub fn summaries(image: &Image) -> Vec<FileSummary> {
    let mut files: BTreeMap<(u8, FileName), FileSummary> = BTreeMap::new();
    for (_, entry) in DirectoryIterator::new(image) {
        let summary = files
            .entry((entry.user, entry.filename))
            .or_insert_with(|| FileSummary {
                user: entry.user,
                filename: entry.filename,
                extents: 0,
                records: 0,
                blocks: 0,
            });
        summary.extents += 1;
        summary.records += entry.record_count as usize;
        summary.blocks += entry.blocks.len();
    }
    files.into_iter().map(|(_, summary)| summary).collect()
}
