//! XLSX (Excel) streaming row reader.
//!
//! The workbook metadata, style sheet and shared string table are loaded up
//! front; worksheet rows are then decoded lazily, in document order.
//!
//! # Example
//!
//! ```no_run
//! use sheetstream::xlsx::{ReadOptions, XlsxReader};
//!
//! let mut reader = XlsxReader::open("spreadsheet.xlsx")?
//!     .with_options(ReadOptions::new().with_fill_gaps(true));
//!
//! for sheet in reader.sheets() {
//!     println!("Sheet {}: {}", sheet.id, sheet.name);
//! }
//!
//! let sheet = reader.select_sheet_by_index(0)?;
//! for row in reader.read(&sheet, 0, Some(9))? {
//!     let (index, values) = row?;
//!     println!("{} {:?}", index, values);
//! }
//! # Ok::<(), sheetstream::Error>(())
//! ```

mod cell;
pub mod date;
mod options;
mod reader;
mod rows;
mod shared_strings;
mod styles;
mod workbook;

pub use cell::{parse_number, CellResolver, CellType, CellValue, Row};
pub use options::ReadOptions;
pub use reader::{SheetSelector, XlsxReader, SHARED_STRINGS_PART, STYLES_PART};
pub use rows::{column_index, Rows, SheetRows, MAX_COLUMNS};
pub use shared_strings::SharedStrings;
pub use styles::{FormatEntry, InferredType, Styles, BUILTIN_FORMATS};
pub use workbook::{Sheet, WorkbookInfo, WORKBOOK_PART};
