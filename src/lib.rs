//! # sheetstream
//!
//! Forward-only streaming row reader for Microsoft Excel workbooks (.xlsx).
//!
//! The workbook's sheet list, cell format table and shared string table are
//! loaded once; worksheet rows are then decoded lazily, so memory use does
//! not grow with the size of a sheet.
//!
//! ## Quick Start
//!
//! ```no_run
//! let mut reader = sheetstream::open("data.xlsx")?;
//!
//! let sheet = reader.select_sheet_by_name("Orders")?;
//! for row in reader.read(&sheet, 1, None)? {
//!     let (index, values) = row?;
//!     println!("{}: {:?}", index, values);
//! }
//! # Ok::<(), sheetstream::Error>(())
//! ```
//!
//! ## Cell values
//!
//! Each cell becomes a [`CellValue`]: shared strings and inline strings are
//! text, date-formatted numbers are rendered as `YYYY-MM-DD HH:MM:SS`
//! timestamps, and other numbers are integers or floats depending on their
//! literal form.

pub mod container;
pub mod error;
pub mod xlsx;
pub mod xml;

// Re-exports
pub use container::{OoxmlContainer, Relationship, Relationships};
pub use error::{Error, Result};
pub use xlsx::{CellValue, ReadOptions, Row, Sheet, SheetSelector, XlsxReader};

use std::path::Path;

/// Open an XLSX file and load its registries.
///
/// # Example
///
/// ```no_run
/// let mut reader = sheetstream::open("data.xlsx")?;
/// let first_row = reader.read_first_sheet(0, Some(0))?.next();
/// # Ok::<(), sheetstream::Error>(())
/// ```
pub fn open(path: impl AsRef<Path>) -> Result<XlsxReader> {
    XlsxReader::open(path)
}

/// Read every row of the first sheet of an XLSX file.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let mut reader = open(path)?;
    let rows: Result<Vec<Row>> = reader
        .read_first_sheet(0, None)?
        .map(|row| row.map(|(_, values)| values))
        .collect();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            open("/nonexistent/book.xlsx"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_open_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(matches!(open(&path), Err(Error::ZipArchive(_))));
    }
}
