//! CP/M "8.3" filenames

use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use crate::disk::error::DiskError;

pub const NAME_SIZE: usize = 8;
pub const EXTENSION_SIZE: usize = 3;

/// Filename and extension fields are padded with spaces.
pub const PADDING_BYTE: u8 = b' ';

/// Characters that CP/M can't represent in a filename are replaced with this.
const REPLACEMENT_BYTE: u8 = b'_';

/// A filename as stored in a directory entry: eight bytes of name and three
/// bytes of extension, each padded with spaces.  Two `FileName`s are equal
/// only if all eleven bytes match.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileName {
    name: [u8; NAME_SIZE],
    extension: [u8; EXTENSION_SIZE],
}

impl FileName {
    /// Build a filename from raw directory entry fields.  No case conversion
    /// or validation is performed.
    pub fn from_fields(name: &[u8], extension: &[u8]) -> FileName {
        assert_eq!(name.len(), NAME_SIZE);
        assert_eq!(extension.len(), EXTENSION_SIZE);
        let mut filename = FileName {
            name: [PADDING_BYTE; NAME_SIZE],
            extension: [PADDING_BYTE; EXTENSION_SIZE],
        };
        filename.name.copy_from_slice(name);
        filename.extension.copy_from_slice(extension);
        filename
    }

    /// Convert a host filename into CP/M form.  The name is upper-cased and
    /// split at the last dot; the parts are silently truncated to eight and
    /// three characters.
    pub fn parse(s: &str) -> io::Result<FileName> {
        let upper = s.to_uppercase();
        let (name, extension) = match upper.rfind('.') {
            Some(dot) => (&upper[..dot], &upper[dot + 1..]),
            None => (&upper[..], ""),
        };
        if name.is_empty() {
            return Err(DiskError::InvalidFilename.into());
        }
        let mut filename = FileName {
            name: [PADDING_BYTE; NAME_SIZE],
            extension: [PADDING_BYTE; EXTENSION_SIZE],
        };
        fill_field(&mut filename.name, name);
        fill_field(&mut filename.extension, extension);
        Ok(filename)
    }

    /// Derive a CP/M filename from the last component of a host path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<FileName> {
        let base = path
            .as_ref()
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DiskError::InvalidFilename.to_io_error())?;
        Self::parse(base)
    }

    /// The eight-byte name field, including padding.
    #[inline]
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    /// The three-byte extension field, including padding.
    #[inline]
    pub fn extension_bytes(&self) -> &[u8] {
        &self.extension
    }

    /// Write both fields into an 11-byte buffer.
    pub fn to_bytes(&self, bytes: &mut [u8]) {
        assert_eq!(bytes.len(), NAME_SIZE + EXTENSION_SIZE);
        bytes[..NAME_SIZE].copy_from_slice(&self.name);
        bytes[NAME_SIZE..].copy_from_slice(&self.extension);
    }
}

fn fill_field(field: &mut [u8], s: &str) {
    for (dst, c) in field.iter_mut().zip(s.chars()) {
        *dst = if c.is_ascii_graphic() {
            c as u8
        } else {
            REPLACEMENT_BYTE
        };
    }
}

/// Render a field for display.  The high bit of each byte may carry a file
/// attribute (read-only, system, archived) so it is masked off.
fn write_field(f: &mut fmt::Formatter, field: &[u8]) -> fmt::Result {
    let end = field
        .iter()
        .rposition(|&b| b & 0x7F != PADDING_BYTE)
        .map_or(0, |p| p + 1);
    for &b in &field[..end] {
        let c = match b & 0x7F {
            c @ 0x20..=0x7E => c as char,
            _ => '?',
        };
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl FromStr for FileName {
    type Err = io::Error;

    fn from_str(s: &str) -> io::Result<FileName> {
        FileName::parse(s)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Render into a string first so width and alignment flags apply.
        let rendered = format!("{}", Rendered(self));
        f.pad(&rendered)
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", Rendered(self))
    }
}

struct Rendered<'a>(&'a FileName);

impl<'a> fmt::Display for Rendered<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_field(f, &self.0.name)?;
        if self.0.extension.iter().any(|&b| b & 0x7F != PADDING_BYTE) {
            f.write_str(".")?;
            write_field(f, &self.0.extension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let filename = FileName::parse("hello.com").unwrap();
        assert_eq!(filename.name_bytes(), b"HELLO   ");
        assert_eq!(filename.extension_bytes(), b"COM");
        assert_eq!(filename.to_string(), "HELLO.COM");

        let filename = FileName::parse("README").unwrap();
        assert_eq!(filename.name_bytes(), b"README  ");
        assert_eq!(filename.extension_bytes(), b"   ");
        assert_eq!(filename.to_string(), "README");
    }

    #[test]
    fn test_parse_truncates() {
        let filename = FileName::parse("verylongname.text").unwrap();
        assert_eq!(filename.name_bytes(), b"VERYLONG");
        assert_eq!(filename.extension_bytes(), b"TEX");

        // Only the last dot separates the extension.
        let filename = FileName::parse("a.b.c").unwrap();
        assert_eq!(filename.name_bytes(), b"A.B     ");
        assert_eq!(filename.extension_bytes(), b"C  ");
    }

    #[test]
    fn test_parse_replaces_unrepresentable() {
        let filename = FileName::parse("my file.é").unwrap();
        assert_eq!(filename.name_bytes(), b"MY_FILE ");
        assert_eq!(filename.extension_bytes(), b"_  ");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(FileName::parse("").unwrap_err() == DiskError::InvalidFilename);
        assert!(FileName::parse(".com").unwrap_err() == DiskError::InvalidFilename);
    }

    #[test]
    fn test_from_path() {
        let filename = FileName::from_path("/tmp/build/stat.com").unwrap();
        assert_eq!(filename, FileName::parse("STAT.COM").unwrap());
    }

    #[test]
    fn test_display_masks_attributes() {
        // Read-only and system attributes live in the extension's high bits.
        let filename = FileName::from_fields(b"PIP     ", &[b'C' | 0x80, b'O' | 0x80, b'M']);
        assert_eq!(filename.to_string(), "PIP.COM");
        assert_ne!(filename, FileName::parse("PIP.COM").unwrap());
        assert_eq!(format!("{:<12}|", filename), "PIP.COM     |");
    }
}
