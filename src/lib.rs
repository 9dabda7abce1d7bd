//! This is a Rust library for working with CP/M 2.2 disk images of the
//! classic 8" single-density kind: 77 tracks of 26 sectors, 128 bytes per
//! sector, with the first two tracks reserved for the system.  The library
//! creates blank images and moves whole files in and out of them.
//!
//! Features:
//!
//! * Create blank 256KB disk images with an empty directory.
//! * Iterate directory entries, and list files with their sizes.
//! * Store files, splitting them across as many extents as they need.
//! * Retrieve files, reassembling their extents in order.
//! * Validate the consistency of the directory.
//! * A sample `cpmdisk` program for operating on disk images from the command
//! line.
//!
//! Current shortcomings:
//!
//! * Only one geometry is supported.  Disk parameter blocks for other drives
//! are not modeled.
//! * Files cannot be deleted, renamed, or appended to.
//! * Files are always written under user 0.
//! * A name that is empty before the extension (such as `""` or `".com"`) is
//! rejected with `InvalidFilename` rather than stored blank.
//! * CP/M records file length only to the 128-byte record, and pads with ^Z
//! (0x1A).  Trailing 0x1A bytes are removed when a file is read, so a file
//! that genuinely ends with them loses those bytes.
//!
//! # Example
//!
//! The following example creates an in-memory disk, stores a file, and reads
//! it back:
//!
//! ```
//! use std::io;
//! use cpm::disk::filename::FileName;
//! use cpm::disk::Disk;
//! # fn main() -> io::Result<()> {
//!
//! let mut disk = Disk::open_memory();
//! let name = FileName::parse("hello.com")?;
//! disk.write_file(&name, b"\xc3\x00\x01")?;
//! assert_eq!(disk.read_file(&name)?, b"\xc3\x00\x01");
//!
//! for file in disk.files() {
//!     println!("{}", file);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For more examples, see the accompanying `cpmdisk` program:
//!
//! ```text
//! cpmdisk work.dsk create
//! cpmdisk work.dsk add HELLO.COM
//! cpmdisk work.dsk list
//! Directory of work.dsk:
//! --------------------------------------------------
//! User  Filename     Size       Blocks
//! --------------------------------------------------
//! 0     HELLO.COM      2048 bytes  2 blocks
//! --------------------------------------------------
//! Total: 1 file(s), 2048 bytes
//! Free: 243KB (243 blocks)
//! ```
//!
//! # Design of disk image access
//!
//! 1. `Image` owns the bytes of the whole image in memory.  Disk image files
//!    are read in full when opened and written in full when saved.
//! 2. The `geometry` module turns directory slots and block numbers into byte
//!    offsets.
//! 3. The `directory` module decodes and encodes the 32-byte entries.  CP/M
//!    has no allocation bitmap, so the allocation state is derived from the
//!    directory every time it is needed.
//! 4. `Disk` exposes high-level functionality such as listing, storing,
//!    retrieving, and validating files.
//!
//! Since every change is made to the in-memory copy first, a store that
//! fails (for lack of blocks or directory entries) leaves both the copy and
//! the file on disk untouched.
//!
//! # License
//!
//! Cpm is distributed under the terms of both the MIT license and the
//! Apache License (Version 2.0).

pub mod disk;

pub use crate::disk::Disk;
