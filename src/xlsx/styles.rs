//! XLSX styles parsing for number formats.
//!
//! Cells carry no explicit "date" marker; a numeric cell is a date only
//! because its style points at a date-like number format. This module builds
//! the style index -> format classification table from `xl/styles.xml`.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Built-in number formats that are implied by their id.
pub const BUILTIN_FORMATS: [(u32, &str); 28] = [
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

/// Format id of "General"; never classified.
const GENERAL_FORMAT_ID: &str = "0";

/// Classification of a number format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InferredType {
    /// The format renders a date and/or time.
    Date,
    /// Nothing could be inferred from the format.
    #[default]
    Unspecified,
}

/// One entry of the cell-style list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatEntry {
    /// Number format code the style points at, if it could be resolved.
    pub format_code: Option<String>,
    /// Classification of `format_code`.
    pub inferred_type: InferredType,
}

/// Cell styles parsed from xl/styles.xml, indexed by style index.
#[derive(Debug, Clone, Default)]
pub struct Styles {
    entries: Vec<FormatEntry>,
}

impl Styles {
    /// Parse styles from xl/styles.xml content.
    ///
    /// Fails with [`Error::MalformedDocument`] when the cell-style list is
    /// absent or a custom format lacks its id or code.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut num_fmts: HashMap<String, String> = BUILTIN_FORMATS
            .iter()
            .map(|(id, code)| (id.to_string(), code.to_string()))
            .collect();
        // numFmtId of each xf in cellXfs, in document order
        let mut cell_xfs: Vec<Option<String>> = Vec::new();

        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut in_num_fmts = false;
        let mut in_cell_xfs = false;
        let mut saw_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"numFmts" => in_num_fmts = true,
                    b"cellXfs" => {
                        in_cell_xfs = true;
                        saw_cell_xfs = true;
                    }
                    b"numFmt" if in_num_fmts => {
                        let (id, code) = parse_num_fmt(e)?;
                        num_fmts.insert(id, code);
                    }
                    b"xf" if in_cell_xfs => cell_xfs.push(num_fmt_id(e)?),
                    _ => {}
                },
                Ok(quick_xml::events::Event::Empty(ref e)) => match e.local_name().as_ref() {
                    b"numFmt" if in_num_fmts => {
                        let (id, code) = parse_num_fmt(e)?;
                        num_fmts.insert(id, code);
                    }
                    b"xf" if in_cell_xfs => cell_xfs.push(num_fmt_id(e)?),
                    b"cellXfs" => saw_cell_xfs = true,
                    _ => {}
                },
                Ok(quick_xml::events::Event::End(ref e)) => match e.local_name().as_ref() {
                    b"numFmts" => in_num_fmts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Ok(quick_xml::events::Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !saw_cell_xfs {
            return Err(Error::MalformedDocument(
                "styles part has no cellXfs element".to_string(),
            ));
        }

        let entries = cell_xfs
            .into_iter()
            .map(|id| {
                let format_code = id.as_ref().and_then(|id| num_fmts.get(id)).cloned();
                let inferred_type = match (id.as_deref(), format_code.as_deref()) {
                    (Some(GENERAL_FORMAT_ID), _) | (_, None) => InferredType::Unspecified,
                    (_, Some(code)) if Self::is_date_format_code(code) => InferredType::Date,
                    _ => InferredType::Unspecified,
                };
                FormatEntry {
                    format_code,
                    inferred_type,
                }
            })
            .collect();

        Ok(Self { entries })
    }

    /// Get the entry for a cell style index.
    pub fn get(&self, style_index: usize) -> Option<&FormatEntry> {
        self.entries.get(style_index)
    }

    /// Whether the style at `style_index` formats its value as a date.
    ///
    /// Unknown indices are not dates.
    pub fn is_date(&self, style_index: usize) -> bool {
        self.get(style_index)
            .is_some_and(|entry| entry.inferred_type == InferredType::Date)
    }

    /// Number of cell styles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a format code string represents a date format.
    ///
    /// Bracketed sections (`[Red]`, `[$-409]`, `[h]`) are dropped first; what
    /// remains is a date if it contains any of `e d h m s` or `yy`. The test is
    /// case-sensitive, so scientific `E+00` does not count.
    pub fn is_date_format_code(format_code: &str) -> bool {
        let stripped = strip_bracketed(format_code);
        stripped.contains(['e', 'd', 'h', 'm', 's']) || stripped.contains("yy")
    }
}

/// Remove every `[...]` section whose brackets are not backslash-escaped.
/// A section holds at least one character; an opening bracket without a
/// matching close is kept as is.
fn strip_bracketed(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;

    while i < chars.len() {
        let escaped = i > 0 && chars[i - 1] == '\\';
        if chars[i] == '[' && !escaped {
            let close = (i + 2..chars.len()).find(|&j| chars[j] == ']' && chars[j - 1] != '\\');
            if let Some(close) = close {
                i = close + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

fn parse_num_fmt(e: &quick_xml::events::BytesStart<'_>) -> Result<(String, String)> {
    let mut id = None;
    let mut code = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"numFmtId" => id = Some(attr.unescape_value()?.into_owned()),
            b"formatCode" => code = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    match (id, code) {
        (Some(id), Some(code)) => Ok((id, code)),
        (Some(id), None) => Err(Error::MalformedDocument(format!(
            "number format {} has no formatCode",
            id
        ))),
        (None, _) => Err(Error::MalformedDocument(
            "number format without numFmtId".to_string(),
        )),
    }
}

fn num_fmt_id(e: &quick_xml::events::BytesStart<'_>) -> Result<Option<String>> {
    Ok(e
        .try_get_attribute("numFmtId")?
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="3">
    <numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/>
    <numFmt numFmtId="165" formatCode="[$-409]mmmm\ d\,\ yyyy;@"/>
    <numFmt numFmtId="166" formatCode="&quot;$&quot;#,##0.00"/>
  </numFmts>
  <cellStyleXfs count="1">
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="8">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1">
      <alignment horizontal="left"/>
    </xf>
    <xf numFmtId="166" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf fontId="1" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="21" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_cell_xfs_in_order() {
        let styles = Styles::parse(STYLES).unwrap();
        assert_eq!(styles.len(), 8);

        assert!(!styles.is_date(0));
        assert!(styles.is_date(1));
        assert!(!styles.is_date(2));
        assert!(styles.is_date(3));
        assert!(styles.is_date(4));
        assert!(!styles.is_date(5));
        assert!(!styles.is_date(6));
        assert!(styles.is_date(7));
        assert!(!styles.is_date(8));

        assert_eq!(styles.get(1).unwrap().format_code.as_deref(), Some("mm-dd-yy"));
        assert_eq!(
            styles.get(3).unwrap().format_code.as_deref(),
            Some("yyyy\\-mm\\-dd")
        );
        assert_eq!(styles.get(5).unwrap().format_code.as_deref(), Some("\"$\"#,##0.00"));
        assert_eq!(styles.get(6).unwrap().format_code, None);
    }

    #[test]
    fn test_general_is_never_a_date() {
        let styles = Styles::parse(STYLES).unwrap();
        let general = styles.get(0).unwrap();
        assert_eq!(general.format_code.as_deref(), Some("General"));
        assert_eq!(general.inferred_type, InferredType::Unspecified);
    }

    #[test]
    fn test_builtin_classification() {
        for (id, code) in BUILTIN_FORMATS {
            let expected = (14..=22).contains(&id) || (45..=47).contains(&id);
            if id == 0 {
                continue;
            }
            assert_eq!(Styles::is_date_format_code(code), expected, "format {id}: {code}");
        }
    }

    #[test]
    fn test_custom_date_format_detection() {
        assert!(Styles::is_date_format_code("yyyy-mm-dd"));
        assert!(Styles::is_date_format_code("d/m/yy"));
        assert!(Styles::is_date_format_code("[$-409]mmmm\\ d\\,\\ yyyy;@"));
        assert!(Styles::is_date_format_code("[h]:mm:ss"));

        assert!(!Styles::is_date_format_code("0.00"));
        assert!(!Styles::is_date_format_code("#,##0"));
        assert!(!Styles::is_date_format_code("\"$\"#,##0.00"));
        assert!(!Styles::is_date_format_code("[Red]0.00"));
        assert!(!Styles::is_date_format_code("0.00E+00"));
    }

    #[test]
    fn test_strip_bracketed() {
        assert_eq!(strip_bracketed("[Red]0.00"), "0.00");
        assert_eq!(strip_bracketed("[$-409]d;[h]"), "d;");
        assert_eq!(strip_bracketed("\\[x]0"), "\\[x]0");
        assert_eq!(strip_bracketed("[0"), "[0");
        assert_eq!(strip_bracketed("[a\\]b]0"), "0");
    }

    #[test]
    fn test_custom_format_without_code_is_malformed() {
        let xml = r#"<styleSheet><numFmts><numFmt numFmtId="170"/></numFmts><cellXfs/></styleSheet>"#;
        assert!(matches!(
            Styles::parse(xml),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_missing_cell_xfs_is_malformed() {
        let xml = r#"<styleSheet><numFmts/></styleSheet>"#;
        assert!(matches!(
            Styles::parse(xml),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_empty_cell_xfs() {
        let styles = Styles::parse("<styleSheet><cellXfs count=\"0\"/></styleSheet>").unwrap();
        assert!(styles.is_empty());
        assert!(!styles.is_date(0));
    }
}
