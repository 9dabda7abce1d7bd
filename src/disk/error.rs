use std::error;
use std::fmt;
use std::io;

/// Errors that can be returned from disk image operations.  These are
/// generally converted into `io::Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiskError {
    /// Unknown error
    Unknown,
    /// Offset out of bounds
    InvalidOffset,
    /// Image is not the expected size
    InvalidLayout,
    /// Directory slot out of bounds
    InvalidSlot,
    /// Block number outside the data region
    InvalidBlock,
    /// Filename is empty
    InvalidFilename,
    /// File not found
    NotFound,
    /// Not enough free blocks
    InsufficientSpace,
    /// Not enough free directory entries
    DirectoryFull,
    /// File needs more extents than an entry can number
    FileTooLarge,
}

impl error::Error for DiskError {
    /// Provide terse descriptions of the errors.
    fn description(&self) -> &str {
        self.message()
    }
}

impl fmt::Display for DiskError {
    /// Provide human-readable descriptions of the errors
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", &self.message())
    }
}

impl From<DiskError> for io::Error {
    fn from(error: DiskError) -> io::Error {
        use std::io::ErrorKind::*;
        // Some variant names also exist in io::ErrorKind, so they are
        // qualified here.
        let kind = match error {
            DiskError::Unknown => Other,
            DiskError::InvalidOffset => InvalidInput,
            DiskError::InvalidLayout => InvalidData,
            DiskError::InvalidSlot => InvalidInput,
            DiskError::InvalidBlock => InvalidData,
            DiskError::InvalidFilename => InvalidInput,
            DiskError::NotFound => io::ErrorKind::NotFound,
            DiskError::InsufficientSpace => Other,
            DiskError::DirectoryFull => Other,
            DiskError::FileTooLarge => InvalidInput,
        };
        io::Error::new(kind, error)
    }
}

impl From<io::Error> for DiskError {
    fn from(error: io::Error) -> DiskError {
        DiskError::from_io_error(&error).unwrap_or(DiskError::Unknown)
    }
}

impl DiskError {
    /// If the provided `io::Error` contains a `DiskError`, return the
    /// underlying `DiskError`.  If not, return None.
    pub fn from_io_error(error: &io::Error) -> Option<DiskError> {
        error
            .get_ref()
            .and_then(|e| e.downcast_ref::<DiskError>())
            .cloned()
    }

    /// For use in closures such as `ok_or_else()`, where `.into()` can't
    /// infer its target.
    pub fn to_io_error(&self) -> io::Error {
        self.clone().into()
    }

    /// Provide terse descriptions of the errors.
    fn message(&self) -> &str {
        use self::DiskError::*;
        match *self {
            Unknown => "unknown error",
            InvalidOffset => "offset out of bounds",
            InvalidLayout => "disk image is not 256KB",
            InvalidSlot => "directory slot out of bounds",
            InvalidBlock => "block number outside the data area",
            InvalidFilename => "filename is empty",
            NotFound => "file not found",
            InsufficientSpace => "not enough free blocks",
            DirectoryFull => "no free directory entries",
            FileTooLarge => "file needs more extents than can be numbered",
        }
    }
}

impl PartialEq<io::Error> for DiskError {
    fn eq(&self, other: &io::Error) -> bool {
        DiskError::from_io_error(other).as_ref() == Some(self)
    }
}

impl PartialEq<DiskError> for io::Error {
    fn eq(&self, other: &DiskError) -> bool {
        other == self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_round_trip() {
        let error: io::Error = DiskError::InsufficientSpace.into();
        assert_eq!(DiskError::from_io_error(&error), Some(DiskError::InsufficientSpace));
        assert!(error == DiskError::InsufficientSpace);
        assert_eq!(error.kind(), io::ErrorKind::Other);

        let error: io::Error = DiskError::NotFound.into();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert_eq!(error.to_string(), "file not found");
    }

    #[test]
    fn test_error_kinds() {
        let kind = |e: DiskError| io::Error::from(e).kind();
        assert_eq!(kind(DiskError::FileTooLarge), io::ErrorKind::InvalidInput);
        assert_eq!(kind(DiskError::InvalidFilename), io::ErrorKind::InvalidInput);
        assert_eq!(kind(DiskError::InvalidLayout), io::ErrorKind::InvalidData);
        assert_eq!(kind(DiskError::DirectoryFull), io::ErrorKind::Other);
        let error: io::Error = DiskError::FileTooLarge.into();
        assert!(error == DiskError::FileTooLarge);
        assert!(error != DiskError::InvalidFilename);
    }

    #[test]
    fn test_foreign_io_error() {
        let error = io::Error::new(io::ErrorKind::Other, "something else");
        assert_eq!(DiskError::from_io_error(&error), None);
        assert_eq!(DiskError::from(error), DiskError::Unknown);
    }
}
