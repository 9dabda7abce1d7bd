use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::fmt;

use crate::disk::directory::{DirectoryEntry, DirectoryIterator};
use crate::disk::extent::{self, ExtentNumber};
use crate::disk::filename::FileName;
use crate::disk::geometry::{block_offset, BLOCK_SIZE, RECORDS_PER_EXTENT};
use crate::disk::image::Image;

/// A validation error represents an inconsistency in the disk image found by
/// the validate() function.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    /// A directory slot references a block outside the data area.
    BlockOutOfRange(usize, u16),
    /// A block is referenced more than once.  The second filename may be the
    /// same as the first if one file references the block twice.
    BlockOveroccupied(u16, FileName, FileName),
    /// A directory slot claims more than 128 records.
    RecordCountOverflow(usize, u8),
    /// A directory slot claims more records than its blocks can hold.
    RecordCountMismatch(usize),
    /// Two extents of a file share an extent number.
    DuplicateExtent(FileName, ExtentNumber),
    /// A file has no extent with this number, but has higher ones.
    MissingExtent(FileName, ExtentNumber),
}

impl error::Error for ValidationError {
    /// Provide terse descriptions of the errors.
    fn description(&self) -> &str {
        use self::ValidationError::*;
        match *self {
            BlockOutOfRange(_, _) => "Block out of range",
            BlockOveroccupied(_, _, _) => "Block occupied by multiple extents",
            RecordCountOverflow(_, _) => "Record count overflow",
            RecordCountMismatch(_) => "Record count exceeds allocated blocks",
            DuplicateExtent(_, _) => "Duplicate extent",
            MissingExtent(_, _) => "Missing extent",
        }
    }
}

impl fmt::Display for ValidationError {
    /// Provide human-readable descriptions of the errors.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ValidationError::*;
        match *self {
            BlockOutOfRange(slot, block) => {
                write!(f, "Directory slot {} references invalid block {}", slot, block)
            }
            BlockOveroccupied(block, ref filename1, ref filename2) => write!(
                f,
                "Block {} occupied by multiple extents, including at least: {:?} {:?}",
                block, filename1, filename2
            ),
            RecordCountOverflow(slot, count) => {
                write!(f, "Directory slot {} has a record count of {}", slot, count)
            }
            RecordCountMismatch(slot) => write!(
                f,
                "Directory slot {} has more records than its blocks can hold",
                slot
            ),
            DuplicateExtent(ref filename, extent) => {
                write!(f, "File {:?} has more than one extent {}", filename, extent)
            }
            MissingExtent(ref filename, extent) => {
                write!(f, "File {:?} is missing extent {}", filename, extent)
            }
        }
    }
}

/// Check the entries of a single directory slot.
fn check_entry(slot: usize, entry: &DirectoryEntry, errors: &mut Vec<ValidationError>) {
    for &block in entry.blocks.iter() {
        if block_offset(block).is_none() {
            errors.push(ValidationError::BlockOutOfRange(slot, block));
        }
    }
    if entry.record_count as usize > RECORDS_PER_EXTENT {
        errors.push(ValidationError::RecordCountOverflow(slot, entry.record_count));
    } else if extent::records_for(entry.blocks.len() * BLOCK_SIZE) < entry.record_count as usize {
        errors.push(ValidationError::RecordCountMismatch(slot));
    }
}

/// Check the consistency of the directory.  This is a read-only operation and
/// does not attempt any repairs.  A list of validation errors is returned.
pub fn validate(image: &Image) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = vec![];
    let mut owners: BTreeMap<u16, FileName> = BTreeMap::new();
    let mut extents: BTreeMap<(u8, FileName), Vec<ExtentNumber>> = BTreeMap::new();

    for (slot, entry) in DirectoryIterator::new(image) {
        check_entry(slot, &entry, &mut errors);
        for &block in entry.blocks.iter() {
            match owners.entry(block) {
                Entry::Occupied(owner) => {
                    errors.push(ValidationError::BlockOveroccupied(
                        block,
                        *owner.get(),
                        entry.filename,
                    ));
                }
                Entry::Vacant(v) => {
                    v.insert(entry.filename);
                }
            }
        }
        extents
            .entry((entry.user, entry.filename))
            .or_insert_with(Vec::new)
            .push(entry.extent);
    }

    // Extent numbers of each file should run 0, 1, 2, ... with no repeats.
    for ((_, filename), numbers) in extents.iter() {
        let mut seen = BTreeSet::new();
        for &number in numbers.iter() {
            if !seen.insert(number) {
                errors.push(ValidationError::DuplicateExtent(*filename, number));
            }
        }
        if let Some(&ExtentNumber(last)) = seen.iter().next_back() {
            for n in 0..last {
                if !seen.contains(&ExtentNumber(n)) {
                    errors.push(ValidationError::MissingExtent(*filename, ExtentNumber(n)));
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::directory::{clear_directory, write_entry};

    fn blank_image() -> Image {
        let mut image = Image::open_memory();
        clear_directory(&mut image);
        image
    }

    fn put(image: &mut Image, slot: usize, name: &str, extent: u16, records: u8, blocks: &[u16]) {
        let filename = FileName::parse(name).unwrap();
        let mut entry = DirectoryEntry::new(0, filename, ExtentNumber(extent));
        entry.record_count = records;
        entry.blocks = blocks.to_vec();
        write_entry(image, slot, &entry).unwrap();
    }

    #[test]
    fn test_clean_image() {
        let mut image = blank_image();
        assert!(validate(&image).is_empty());
        put(&mut image, 0, "A", 0, 128, &(2..18).collect::<Vec<u16>>());
        put(&mut image, 1, "A", 1, 3, &[18]);
        put(&mut image, 2, "B", 0, 0, &[]);
        assert!(validate(&image).is_empty());
    }

    #[test]
    fn test_block_errors() {
        let mut image = blank_image();
        put(&mut image, 0, "A", 0, 8, &[1, 2]);
        put(&mut image, 1, "B", 0, 8, &[2, 249]);
        let errors = validate(&image);
        let a = FileName::parse("A").unwrap();
        let b = FileName::parse("B").unwrap();
        assert!(errors.contains(&ValidationError::BlockOutOfRange(0, 1)));
        assert!(errors.contains(&ValidationError::BlockOutOfRange(1, 249)));
        assert!(errors.contains(&ValidationError::BlockOveroccupied(2, a, b)));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_record_count_errors() {
        let mut image = blank_image();
        put(&mut image, 0, "A", 0, 129, &[2]);
        put(&mut image, 1, "B", 0, 9, &[3]);
        put(&mut image, 2, "C", 0, 8, &[4]);
        let errors = validate(&image);
        assert_eq!(
            errors,
            vec![
                ValidationError::RecordCountOverflow(0, 129),
                ValidationError::RecordCountMismatch(1),
            ]
        );
    }

    #[test]
    fn test_extent_errors() {
        let mut image = blank_image();
        put(&mut image, 0, "A", 0, 128, &[2]);
        put(&mut image, 1, "A", 2, 1, &[3]);
        put(&mut image, 2, "B", 0, 1, &[4]);
        put(&mut image, 3, "B", 0, 1, &[5]);
        let errors = validate(&image);
        let a = FileName::parse("A").unwrap();
        let b = FileName::parse("B").unwrap();
        assert!(errors.contains(&ValidationError::MissingExtent(a, ExtentNumber(1))));
        assert!(errors.contains(&ValidationError::DuplicateExtent(b, ExtentNumber(0))));
    }
}
