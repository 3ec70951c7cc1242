//! Worksheet row stream.
//!
//! Rows are decoded lazily from a forward-only event source. Rows before the
//! requested start are skipped structurally, without looking at their cells.

use super::cell::{CellResolver, CellValue, Row};
use crate::container::PartReader;
use crate::error::{Error, Result};
use crate::xml::{Element, EventSource, QuickXmlSource, XmlCursor};

/// Row stream over a worksheet part opened from the package.
pub type SheetRows<'a> = Rows<'a, QuickXmlSource<PartReader<'a>>>;

/// Lazy sequence of `(row index, values)` pairs.
///
/// The row index is the 0-based position of the row element in the part.
/// Iteration stops after `end` (inclusive), when the rows run out, or after
/// the first error; in each case the underlying part is dropped.
pub struct Rows<'a, S> {
    cursor: Option<XmlCursor<S>>,
    resolver: CellResolver<'a>,
    fill_gaps: bool,
    start: usize,
    end: Option<usize>,
    /// Position of the next row element.
    position: usize,
    /// First row element, found while checking the part has rows at all.
    pending: Option<Element>,
}

impl<'a, S: EventSource> Rows<'a, S> {
    /// Start a row stream over a worksheet's events.
    ///
    /// Fails with [`Error::NotFound`] if the worksheet holds no row element.
    pub fn new(
        source: S,
        resolver: CellResolver<'a>,
        fill_gaps: bool,
        start: usize,
        end: Option<usize>,
    ) -> Result<Self> {
        check_range(start, end)?;

        let mut cursor = XmlCursor::new(source);
        let first = cursor
            .advance_to("row")?
            .ok_or_else(|| Error::NotFound("worksheet contains no rows".to_string()))?;

        Ok(Self {
            cursor: Some(cursor),
            resolver,
            fill_gaps,
            start,
            end,
            position: 0,
            pending: Some(first),
        })
    }

    fn next_row_element(&mut self) -> Result<Option<Element>> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        match self.cursor.as_mut() {
            Some(cursor) => cursor.advance_to("row"),
            None => Ok(None),
        }
    }

    fn advance(&mut self) -> Result<Option<(usize, Row)>> {
        if self.end.is_some_and(|end| self.position > end) {
            return Ok(None);
        }

        let mut row = match self.next_row_element()? {
            Some(row) => row,
            None => return Ok(None),
        };

        if self.position < self.start {
            let skipped_from = self.position;
            while self.position < self.start {
                if let Some(cursor) = self.cursor.as_mut() {
                    cursor.skip_subtree(&row)?;
                }
                self.position += 1;
                row = match self.next_row_element()? {
                    Some(row) => row,
                    None => {
                        log::trace!(
                            "sheet ended after skipping {} rows",
                            self.position - skipped_from
                        );
                        return Ok(None);
                    }
                };
            }
            log::trace!("skipped rows {}..{}", skipped_from, self.position);
        }

        let cursor = match self.cursor.as_mut() {
            Some(cursor) => cursor,
            None => return Ok(None),
        };
        let values = decode_row(cursor, &self.resolver, self.fill_gaps)?;
        let index = self.position;
        self.position += 1;
        Ok(Some((index, values)))
    }

    fn finish(&mut self) {
        if self.cursor.take().is_some() {
            log::debug!("row stream finished after {} rows", self.position);
        }
        self.pending = None;
    }
}

impl<S: EventSource> Iterator for Rows<'_, S> {
    type Item = Result<(usize, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.as_ref()?;

        match self.advance() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<S: EventSource> std::iter::FusedIterator for Rows<'_, S> {}

/// Validate a requested row range.
pub(crate) fn check_range(start: usize, end: Option<usize>) -> Result<()> {
    match end {
        Some(end) if start > end => Err(Error::InvalidArgument(format!(
            "start row {} is after end row {}",
            start, end
        ))),
        _ => Ok(()),
    }
}

/// Decode the cells of the row element the cursor just entered.
fn decode_row<S: EventSource>(
    cursor: &mut XmlCursor<S>,
    resolver: &CellResolver<'_>,
    fill_gaps: bool,
) -> Result<Row> {
    let mut values = Row::new();

    while let Some(child) = cursor.next_child()? {
        if child.name != "c" {
            cursor.skip_subtree(&child)?;
            continue;
        }

        if fill_gaps {
            if let Some(column) = child.attribute("r").and_then(column_index) {
                while values.len() < column {
                    values.push(CellValue::Empty);
                }
            }
        }

        let cell_type = resolver.cell_type(child.attribute("t"), child.attribute("s"))?;
        let raw = read_cell_text(cursor)?;
        values.push(resolver.coerce(cell_type, &raw)?);
    }

    Ok(values)
}

/// Raw text of the cell element the cursor just entered.
///
/// The `v` child wins; without one, the text of the remaining children
/// (an inline `is` string, for instance) is used. Formulas are ignored.
fn read_cell_text<S: EventSource>(cursor: &mut XmlCursor<S>) -> Result<String> {
    let mut value = None;
    let mut other = String::new();

    while let Some(child) = cursor.next_child()? {
        match child.name.as_str() {
            "v" => value = Some(cursor.read_subtree_text()?),
            "f" => cursor.skip_subtree(&child)?,
            _ => other.push_str(&cursor.read_subtree_text()?),
        }
    }

    Ok(value.unwrap_or(other))
}

/// Number of columns in a worksheet (`A` through `XFD`).
pub const MAX_COLUMNS: usize = 16_384;

/// 0-based column of a cell reference such as `C5` (`Some(2)`).
///
/// References past column `XFD` are rejected.
pub fn column_index(reference: &str) -> Option<usize> {
    let mut column = 0usize;
    let mut letters = 0;
    for b in reference.bytes() {
        if !b.is_ascii_alphabetic() {
            break;
        }
        letters += 1;
        if letters > 3 {
            return None;
        }
        column = column * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1;
    }
    if letters == 0 || column > MAX_COLUMNS {
        return None;
    }
    Some(column - 1)
}
