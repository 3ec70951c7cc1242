//! Reader session over an XLSX package.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use super::cell::{CellResolver, Row};
use super::options::ReadOptions;
use super::rows::{check_range, Rows, SheetRows};
use super::shared_strings::SharedStrings;
use super::styles::Styles;
use super::workbook::{Sheet, WorkbookInfo, WORKBOOK_PART};
use crate::container::OoxmlContainer;
use crate::error::{Error, Result};
use crate::xml::QuickXmlSource;

/// Path of the style sheet part.
pub const STYLES_PART: &str = "xl/styles.xml";

/// Path of the shared string table part.
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// How to pick a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// 0-based position in workbook order.
    Index(usize),
    /// `sheetId` attribute.
    Id(u32),
    /// Exact sheet name.
    Name(String),
}

/// Streaming reader for XLSX workbooks.
///
/// The workbook metadata, style sheet and shared string table are loaded
/// once when the reader is created. Rows are then decoded lazily, one
/// worksheet part at a time.
///
/// # Example
///
/// ```no_run
/// use sheetstream::xlsx::XlsxReader;
///
/// let mut reader = XlsxReader::open("data.xlsx")?;
/// let sheet = reader.select_sheet_by_name("Sales")?;
/// for row in reader.read(&sheet, 1, None)? {
///     let (index, values) = row?;
///     println!("{}: {:?}", index, values);
/// }
/// # Ok::<(), sheetstream::Error>(())
/// ```
pub struct XlsxReader<R = BufReader<File>> {
    container: OoxmlContainer<R>,
    workbook: WorkbookInfo,
    styles: Styles,
    shared_strings: SharedStrings,
    options: ReadOptions,
}

impl XlsxReader<BufReader<File>> {
    /// Open an XLSX file and load its registries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let container = OoxmlContainer::open(path)?;
        Self::load(container)
    }
}

impl XlsxReader<Cursor<Vec<u8>>> {
    /// Load a workbook held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let container = OoxmlContainer::from_bytes(data)?;
        Self::load(container)
    }
}

impl<R: Read + Seek> XlsxReader<R> {
    /// Load the workbook metadata, style sheet and shared strings from an
    /// opened package.
    ///
    /// The style sheet is required; a package without a shared string table
    /// simply has no shared strings.
    pub fn load(mut container: OoxmlContainer<R>) -> Result<Self> {
        let rels = container.read_relationships(WORKBOOK_PART)?;
        let workbook = WorkbookInfo::parse(&container.read_xml(WORKBOOK_PART)?, &rels)?;

        let styles = Styles::parse(&container.read_xml(STYLES_PART)?)?;

        let shared_strings = if container.exists(SHARED_STRINGS_PART) {
            SharedStrings::parse(&container.read_xml(SHARED_STRINGS_PART)?)?
        } else {
            SharedStrings::default()
        };

        log::debug!(
            "loaded workbook: {} sheets, {} cell formats, {} shared strings, date1904={}",
            workbook.sheets.len(),
            styles.len(),
            shared_strings.len(),
            workbook.date1904
        );

        Ok(Self {
            container,
            workbook,
            styles,
            shared_strings,
            options: ReadOptions::default(),
        })
    }

    /// Replace the read options.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Sheets in workbook order.
    pub fn sheets(&self) -> &[Sheet] {
        &self.workbook.sheets
    }

    /// Whether the workbook uses the 1904 date system.
    pub fn date1904(&self) -> bool {
        self.workbook.date1904
    }

    /// The shared string table.
    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    /// The cell format registry.
    pub fn formats(&self) -> &Styles {
        &self.styles
    }

    /// The sheet read when no other is chosen.
    pub fn first_sheet(&self) -> Result<&Sheet> {
        self.workbook
            .sheets
            .first()
            .ok_or_else(|| Error::NotFound("workbook has no sheets".to_string()))
    }

    /// Select a sheet by its 0-based position.
    pub fn select_sheet_by_index(&self, index: usize) -> Result<Sheet> {
        self.workbook.sheets.get(index).cloned().ok_or_else(|| {
            Error::NotFound(format!(
                "no sheet at index {} (workbook has {})",
                index,
                self.workbook.sheets.len()
            ))
        })
    }

    /// Select a sheet by its `sheetId`.
    pub fn select_sheet_by_id(&self, id: u32) -> Result<Sheet> {
        self.workbook
            .sheets
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no sheet with id {}", id)))
    }

    /// Select a sheet by name.
    pub fn select_sheet_by_name(&self, name: &str) -> Result<Sheet> {
        self.workbook
            .sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no sheet named {:?}", name)))
    }

    /// Select a sheet with any selector.
    pub fn select(&self, selector: &SheetSelector) -> Result<Sheet> {
        match selector {
            SheetSelector::Index(index) => self.select_sheet_by_index(*index),
            SheetSelector::Id(id) => self.select_sheet_by_id(*id),
            SheetSelector::Name(name) => self.select_sheet_by_name(name),
        }
    }

    /// Stream rows `start..=end` of `sheet` (to the last row when `end` is
    /// `None`).
    ///
    /// The range is checked before the package is touched. The returned
    /// stream borrows the reader, so only one sheet part is open at a time.
    pub fn read(&mut self, sheet: &Sheet, start: usize, end: Option<usize>) -> Result<SheetRows<'_>> {
        check_range(start, end)?;

        let Self {
            container,
            workbook,
            styles,
            shared_strings,
            options,
        } = self;

        log::debug!("opening sheet {:?} at {}", sheet.name, sheet.path);
        let part = container.open_part(&sheet.path)?;
        let resolver = CellResolver::new(
            shared_strings,
            styles,
            workbook.date1904,
            &options.date_format,
        );

        Rows::new(
            QuickXmlSource::new(part),
            resolver,
            options.fill_gaps,
            start,
            end,
        )
    }

    /// Stream rows of the first sheet.
    pub fn read_first_sheet(&mut self, start: usize, end: Option<usize>) -> Result<SheetRows<'_>> {
        check_range(start, end)?;
        let sheet = self.first_sheet()?.clone();
        self.read(&sheet, start, end)
    }

    /// Decode a single row, or `None` when the sheet has fewer rows.
    pub fn row(&mut self, sheet: &Sheet, index: usize) -> Result<Option<Row>> {
        let mut rows = self.read(sheet, index, Some(index))?;
        let first = rows.next().transpose()?;
        Ok(first.map(|(_, values)| values))
    }
}

impl<R: Read + Seek> std::fmt::Debug for XlsxReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxReader")
            .field("sheets", &self.workbook.sheets)
            .field("date1904", &self.workbook.date1904)
            .field("formats", &self.styles.len())
            .field("shared_strings", &self.shared_strings.len())
            .field("options", &self.options)
            .finish()
    }
}
