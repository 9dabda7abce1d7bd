use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap::MmapOptions;

use crate::disk::error::DiskError;
use crate::disk::geometry::DISK_SIZE;

/// An owned, in-memory copy of an entire disk image.  All edits happen here;
/// nothing reaches the backing file until `save()` is called.
#[derive(Clone)]
pub struct Image {
    data: Box<[u8]>,
}

impl Image {
    /// Return a zero-filled image of the standard size.
    pub fn open_memory() -> Image {
        Image {
            data: vec![0; DISK_SIZE].into_boxed_slice(),
        }
    }

    /// Adopt an existing buffer as an image.  The buffer must be exactly
    /// `DISK_SIZE` bytes long.
    pub fn from_bytes(bytes: Vec<u8>) -> io::Result<Image> {
        if bytes.len() != DISK_SIZE {
            return Err(DiskError::InvalidLayout.into());
        }
        Ok(Image {
            data: bytes.into_boxed_slice(),
        })
    }

    /// Read an entire image file into memory.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Image> {
        let file = File::open(path)?;
        if file.metadata()?.len() != DISK_SIZE as u64 {
            return Err(DiskError::InvalidLayout.into());
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Image {
            data: mmap[..].to_vec().into_boxed_slice(),
        })
    }

    /// Write the entire image to `path`.  If `create_new` is true, no file is
    /// allowed to exist at the target location.  If false, any existing file
    /// will be overwritten.
    pub fn save<P: AsRef<Path>>(&self, path: P, create_new: bool) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if create_new {
            options.create_new(true);
        } else {
            options.create(true);
        }
        let file = options.open(path)?;
        file.set_len(self.data.len() as u64)?;
        let mut mmap = unsafe { MmapOptions::new().map_mut(&file)? };
        mmap.copy_from_slice(&self.data);
        mmap.flush()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn check_bounds(&self, offset: usize, length: usize) -> io::Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(DiskError::InvalidOffset.into()),
        }
    }

    pub fn slice(&self, offset: usize, length: usize) -> io::Result<&[u8]> {
        self.check_bounds(offset, length)?;
        Ok(&self.data[offset..offset + length])
    }

    pub fn slice_mut(&mut self, offset: usize, length: usize) -> io::Result<&mut [u8]> {
        self.check_bounds(offset, length)?;
        Ok(&mut self.data[offset..offset + length])
    }
}
