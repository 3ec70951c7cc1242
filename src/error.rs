//! Error types for the sheetstream library.

use std::io;
use thiserror::Error;

/// Result type alias for sheetstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a workbook or streaming its rows.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// A part could not be opened inside the package.
    #[error("Can't open part: {0}")]
    MissingPart(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A caller supplied argument is out of its valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A worksheet selector or a required element could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A shared string reference points past the end of the table.
    #[error("Shared string index {index} out of range (table holds {len} entries)")]
    IndexOutOfRange {
        /// The referenced index.
        index: usize,
        /// Number of entries in the shared string table.
        len: usize,
    },

    /// A required structural element or attribute is absent or unusable.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("start must not exceed end".to_string());
        assert_eq!(err.to_string(), "Invalid argument: start must not exceed end");

        let err = Error::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "Shared string index 7 out of range (table holds 3 entries)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
