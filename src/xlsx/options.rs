//! Row reading options.

use super::date::DEFAULT_DATE_FORMAT;

/// Options for reading worksheet rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Insert `CellValue::Empty` for columns a row skips, using each
    /// cell's `r` reference. Off by default: rows then hold only the cells
    /// present in the part.
    pub fill_gaps: bool,

    /// strftime layout for date cells
    pub date_format: String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fill_gaps: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl ReadOptions {
    /// Create default read options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pad skipped columns with empty values.
    pub fn with_fill_gaps(mut self, fill: bool) -> Self {
        self.fill_gaps = fill;
        self
    }

    /// Set the layout used to render date cells.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }
}
