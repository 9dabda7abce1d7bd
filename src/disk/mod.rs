//! CP/M disk images

mod allocation;
mod error;
mod extent;
mod image;
mod validation;

pub mod directory;
pub mod file;
pub mod filename;
pub mod geometry;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use slog::{Drain, Logger};

use crate::disk::directory::{DirectoryEntry, DirectoryIterator};
use crate::disk::file::{File, FileSummary};
use crate::disk::filename::FileName;
use crate::disk::geometry::{BLOCK_SIZE, DATA_OFFSET, DIR_ENTRIES, DIR_OFFSET, DISK_SIZE};

pub use self::allocation::{find_free_blocks, find_free_slot, used_blocks, AllocationMap};
pub use self::error::DiskError;
pub use self::extent::ExtentNumber;
pub use self::image::Image;
pub use self::validation::ValidationError;

fn default_logger() -> Logger {
    Logger::root(slog_stdlog::StdLog.fuse(), slog::o!())
}

/// A CP/M disk image held entirely in memory.
///
/// Every operation works on the in-memory copy.  Changes reach the backing
/// file only when `save()` is called, so an operation that fails part way
/// leaves the file as it was.
pub struct Disk {
    image: Image,
    path: Option<PathBuf>,
    logger: Logger,
}

impl Disk {
    fn new(image: Image, path: Option<PathBuf>, logger: Logger) -> Disk {
        let logger = match path {
            Some(ref path) => logger.new(slog::o!("image" => path.display().to_string())),
            None => logger,
        };
        Disk {
            image,
            path,
            logger,
        }
    }

    /// Return a freshly formatted in-memory disk with no backing file.
    pub fn open_memory() -> Disk {
        Self::new(blank_image(), None, default_logger())
    }

    /// Wrap an existing image with no backing file.
    pub fn from_image(image: Image) -> Disk {
        Self::new(image, None, default_logger())
    }

    /// Load an existing disk image.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Disk> {
        Self::open_with_logger(path, default_logger())
    }

    pub fn open_with_logger<P: AsRef<Path>>(path: P, logger: Logger) -> io::Result<Disk> {
        let path = path.as_ref();
        let image = Image::load(path)?;
        let disk = Self::new(image, Some(path.to_path_buf()), logger);
        slog::debug!(disk.logger, "loaded disk image");
        Ok(disk)
    }

    /// Create a new blank disk image and write it to `path`.  If `create_new`
    /// is true, no file is allowed to exist at the target location.  If
    /// false, any existing file will be overwritten.
    pub fn create<P: AsRef<Path>>(path: P, create_new: bool) -> io::Result<Disk> {
        Self::create_with_logger(path, create_new, default_logger())
    }

    pub fn create_with_logger<P: AsRef<Path>>(
        path: P,
        create_new: bool,
        logger: Logger,
    ) -> io::Result<Disk> {
        let path = path.as_ref();
        let image = blank_image();
        image.save(path, create_new)?;
        let disk = Self::new(image, Some(path.to_path_buf()), logger);
        slog::info!(disk.logger, "created disk image"; "size" => DISK_SIZE);
        Ok(disk)
    }

    /// Write the image back to the file it was loaded from.  In-memory disks
    /// have nothing to write.
    pub fn save(&self) -> io::Result<()> {
        match self.path {
            Some(ref path) => {
                self.image.save(path, false)?;
                slog::debug!(self.logger, "saved disk image");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Write the image to a new location, which becomes the target of later
    /// `save()` calls.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P, create_new: bool) -> io::Result<()> {
        let path = path.as_ref();
        self.image.save(path, create_new)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref().map(|p| p.as_path())
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Return an iterator of the occupied directory entries on this disk,
    /// along with their slot numbers.
    pub fn iter(&self) -> DirectoryIterator {
        DirectoryIterator::new(&self.image)
    }

    /// Return a list of all occupied directory entries.
    pub fn directory(&self) -> Vec<DirectoryEntry> {
        self.iter().map(|(_, entry)| entry).collect()
    }

    /// Return one summary per file, ordered by user number and filename.
    pub fn files(&self) -> Vec<FileSummary> {
        file::summaries(&self.image)
    }

    /// Open a file based on its filename.
    pub fn open_file(&self, filename: &FileName) -> io::Result<File> {
        File::open(&self.image, filename)
    }

    /// Read the full contents of a file.
    pub fn read_file(&self, filename: &FileName) -> io::Result<Vec<u8>> {
        file::retrieve(&self.image, filename, &self.logger)
    }

    /// Add a new file to the disk, returning the number of bytes written.  The
    /// backing file is not touched until `save()` is called.
    pub fn write_file(&mut self, filename: &FileName, data: &[u8]) -> io::Result<usize> {
        file::store(&mut self.image, filename, data, &self.logger)
    }

    /// Return the current block allocation, as derived from the directory.
    pub fn allocation(&self) -> AllocationMap {
        AllocationMap::read(&self.image)
    }

    /// Return the number of blocks that can still be allocated.
    pub fn blocks_free(&self) -> usize {
        self.allocation().blocks_free()
    }

    /// Check the consistency of the directory.  A list of validation errors is
    /// returned.
    pub fn validate(&self) -> Vec<ValidationError> {
        validation::validate(&self.image)
    }
}

impl fmt::Display for Disk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref path) = self.path {
            writeln!(f, "{}", path.display())?;
        }
        writeln!(f, "  Size: {} bytes ({}KB)", DISK_SIZE, DISK_SIZE / 1024)?;
        writeln!(f, "  Directory at: 0x{:04X} ({} bytes)", DIR_OFFSET, DIR_OFFSET)?;
        writeln!(f, "  Data area at: 0x{:04X} ({} bytes)", DATA_OFFSET, DATA_OFFSET)?;
        writeln!(f, "  Directory entries: {}", DIR_ENTRIES)?;
        write!(
            f,
            "  Free: {}KB ({} blocks)",
            self.blocks_free() * BLOCK_SIZE / 1024,
            self.blocks_free()
        )
    }
}

impl<'a> IntoIterator for &'a Disk {
    type Item = (usize, DirectoryEntry);
    type IntoIter = DirectoryIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        DirectoryIterator::new(&self.image)
    }
}

/// Return a zeroed image with an empty directory.
fn blank_image() -> Image {
    let mut image = Image::open_memory();
    directory::clear_directory(&mut image);
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::geometry::{entry_offset, ENTRY_SIZE, TOTAL_BLOCKS};

    #[test]
    fn test_blank_disk() {
        let disk = Disk::open_memory();
        let bytes = disk.image().as_bytes();
        assert_eq!(bytes.len(), DISK_SIZE);
        for slot in 0..DIR_ENTRIES {
            let offset = entry_offset(slot);
            assert_eq!(bytes[offset], 0xE5);
            assert!(bytes[offset + 1..offset + ENTRY_SIZE].iter().all(|&b| b == 0));
        }
        assert_eq!(bytes.iter().filter(|&&b| b != 0).count(), DIR_ENTRIES);
        assert!(disk.directory().is_empty());
        assert!(disk.files().is_empty());
        assert_eq!(disk.blocks_free(), TOTAL_BLOCKS - 2);
        assert!(disk.validate().is_empty());
    }

    #[test]
    fn test_write_and_read() {
        let mut disk = Disk::open_memory();
        let name = FileName::parse("hello.com").unwrap();
        let data: Vec<u8> = (0..2000).map(|i| (i % 200) as u8 + 32).collect();
        assert_eq!(disk.write_file(&name, &data).unwrap(), 2000);
        assert_eq!(disk.read_file(&name).unwrap(), data);
        assert_eq!(disk.blocks_free(), TOTAL_BLOCKS - 4);
        assert_eq!(disk.directory().len(), 1);
        assert_eq!((&disk).into_iter().count(), 1);
        // Saving an in-memory disk is a no-op.
        disk.save().unwrap();
    }

    #[test]
    fn test_display() {
        let disk = Disk::open_memory();
        let text = disk.to_string();
        assert!(text.contains("Directory at: 0x1A00 (6656 bytes)"));
        assert!(text.contains("Data area at: 0x2200 (8704 bytes)"));
        assert!(text.contains("Free: 245KB (245 blocks)"));
    }
}
