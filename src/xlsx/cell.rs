//! Cell type resolution and value coercion.

use serde::Serialize;

use super::date;
use super::shared_strings::SharedStrings;
use super::styles::Styles;
use crate::error::{Error, Result};

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Placeholder for a column the row skipped (only with gap filling).
    Empty,
    /// Text, including shared strings and anything that is not numeric.
    Text(String),
    /// Integer literal.
    Int(i64),
    /// Decimal or exponential literal.
    Float(f64),
    /// Boolean cell.
    Bool(bool),
    /// Date cell rendered as a timestamp.
    Date(String),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) | CellValue::Date(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Decoded row: one value per cell element present in the source, in
/// document order.
pub type Row = Vec<CellValue>;

/// Effective type of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// `t="s"`: the value is an index into the shared string table.
    SharedString,
    /// `t="d"`, or an untyped cell whose style uses a date format.
    Date,
    /// `t="b"`.
    Boolean,
    /// `t="n"`, or an untyped cell without a date style.
    Number,
    /// Any other declared type (`str`, `inlineStr`, `e`).
    Text,
}

impl CellType {
    /// Resolve the type from the declared `t` attribute. The style is only
    /// consulted when no type is declared.
    pub fn resolve(declared: Option<&str>, style_index: Option<usize>, styles: &Styles) -> Self {
        match declared {
            Some("s") => CellType::SharedString,
            Some("d") => CellType::Date,
            Some("b") => CellType::Boolean,
            Some("n") => CellType::Number,
            None => match style_index {
                Some(index) if styles.is_date(index) => CellType::Date,
                _ => CellType::Number,
            },
            Some(_) => CellType::Text,
        }
    }
}

/// Parse a cell's raw text with the numeric grammar:
///
/// ```text
/// number   = sign? mantissa exponent?
/// mantissa = digits ("." digits?)? | "." digits
/// exponent = ("e" | "E") sign? digits
/// ```
///
/// A number without fraction or exponent is an integer; one that does not
/// fit in `i64` becomes a float. Anything else, including surrounding
/// whitespace, is not a number.
pub fn parse_number(raw: &str) -> Option<CellValue> {
    let bytes = raw.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut is_float = false;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        is_float = true;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        is_float = true;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }

    if !is_float {
        if let Ok(n) = raw.parse::<i64>() {
            return Some(CellValue::Int(n));
        }
    }
    raw.parse::<f64>().ok().map(CellValue::Float)
}

/// Turns raw cell text into values using the workbook registries.
#[derive(Debug, Clone, Copy)]
pub struct CellResolver<'a> {
    shared_strings: &'a SharedStrings,
    styles: &'a Styles,
    date1904: bool,
    date_format: &'a str,
}

impl<'a> CellResolver<'a> {
    /// Create a resolver over loaded registries.
    pub fn new(
        shared_strings: &'a SharedStrings,
        styles: &'a Styles,
        date1904: bool,
        date_format: &'a str,
    ) -> Self {
        Self {
            shared_strings,
            styles,
            date1904,
            date_format,
        }
    }

    /// Resolve a cell's type from its `t` and `s` attributes.
    pub fn cell_type(&self, declared: Option<&str>, style: Option<&str>) -> Result<CellType> {
        let style_index = match style {
            Some(s) => Some(s.trim().parse::<usize>().map_err(|_| {
                Error::MalformedDocument(format!("invalid style index {:?}", s))
            })?),
            None => None,
        };
        Ok(CellType::resolve(declared, style_index, self.styles))
    }

    /// Coerce raw text according to `cell_type`.
    pub fn coerce(&self, cell_type: CellType, raw: &str) -> Result<CellValue> {
        match cell_type {
            CellType::SharedString => {
                let index = raw.trim().parse::<usize>().map_err(|_| {
                    Error::MalformedDocument(format!("invalid shared string index {:?}", raw))
                })?;
                Ok(CellValue::Text(self.shared_strings.resolve(index)?.to_string()))
            }
            CellType::Date => match raw.trim().parse::<f64>() {
                Ok(serial) => Ok(CellValue::Date(date::format_serial(
                    serial,
                    self.date1904,
                    self.date_format,
                )?)),
                // ISO 8601 text from t="d", or an empty styled cell
                Err(_) => Ok(CellValue::Text(raw.to_string())),
            },
            CellType::Boolean => {
                let value = raw.trim();
                Ok(CellValue::Bool(value == "1" || value.eq_ignore_ascii_case("true")))
            }
            CellType::Number | CellType::Text => {
                Ok(parse_number(raw).unwrap_or_else(|| CellValue::Text(raw.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::date::DEFAULT_DATE_FORMAT;

    fn styles() -> Styles {
        Styles::parse(
            r#"<styleSheet><cellXfs>
                <xf numFmtId="0"/>
                <xf numFmtId="14"/>
                <xf numFmtId="4"/>
            </cellXfs></styleSheet>"#,
        )
        .unwrap()
    }

    fn shared() -> SharedStrings {
        SharedStrings::parse("<sst><si><t>a</t></si><si><t>b</t></si><si><t>c</t></si><si><t>d</t></si></sst>")
            .unwrap()
    }

    #[test]
    fn test_parse_number_integers() {
        assert_eq!(parse_number("42"), Some(CellValue::Int(42)));
        assert_eq!(parse_number("-7"), Some(CellValue::Int(-7)));
        assert_eq!(parse_number("+3"), Some(CellValue::Int(3)));
        assert_eq!(parse_number("007"), Some(CellValue::Int(7)));
    }

    #[test]
    fn test_parse_number_floats() {
        assert_eq!(parse_number("12.50"), Some(CellValue::Float(12.5)));
        assert_eq!(parse_number(".5"), Some(CellValue::Float(0.5)));
        assert_eq!(parse_number("5."), Some(CellValue::Float(5.0)));
        assert_eq!(parse_number("1e3"), Some(CellValue::Float(1000.0)));
        assert_eq!(parse_number("-2.5E-1"), Some(CellValue::Float(-0.25)));
        assert_eq!(
            parse_number("99999999999999999999"),
            Some(CellValue::Float(1e20))
        );
    }

    #[test]
    fn test_parse_number_rejects() {
        for raw in ["", "-", ".", "1e", "1e+", "e5", " 1", "1 ", "1.2.3", "0x10", "inf", "NaN", "1,000", "12abc"] {
            assert_eq!(parse_number(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn test_cell_type_resolution() {
        let styles = styles();
        assert_eq!(CellType::resolve(Some("s"), Some(1), &styles), CellType::SharedString);
        assert_eq!(CellType::resolve(Some("b"), None, &styles), CellType::Boolean);
        assert_eq!(CellType::resolve(Some("d"), None, &styles), CellType::Date);
        assert_eq!(CellType::resolve(None, Some(1), &styles), CellType::Date);
        assert_eq!(CellType::resolve(Some("n"), Some(1), &styles), CellType::Number);
        assert_eq!(CellType::resolve(None, Some(2), &styles), CellType::Number);
        assert_eq!(CellType::resolve(None, Some(40), &styles), CellType::Number);
        assert_eq!(CellType::resolve(None, None, &styles), CellType::Number);
        assert_eq!(CellType::resolve(Some("str"), Some(1), &styles), CellType::Text);
        assert_eq!(CellType::resolve(Some("inlineStr"), None, &styles), CellType::Text);
    }

    #[test]
    fn test_coerce_shared_string() {
        let (styles, shared) = (styles(), shared());
        let resolver = CellResolver::new(&shared, &styles, false, DEFAULT_DATE_FORMAT);
        assert_eq!(
            resolver.coerce(CellType::SharedString, "3").unwrap(),
            CellValue::Text("d".to_string())
        );
        assert!(matches!(
            resolver.coerce(CellType::SharedString, "4"),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
        assert!(matches!(
            resolver.coerce(CellType::SharedString, "x"),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_coerce_date() {
        let (styles, shared) = (styles(), shared());
        let resolver = CellResolver::new(&shared, &styles, false, DEFAULT_DATE_FORMAT);
        assert_eq!(
            resolver.coerce(CellType::Date, "44197").unwrap(),
            CellValue::Date("2021-01-01 00:00:00".to_string())
        );
        assert_eq!(
            resolver.coerce(CellType::Date, "2021-01-01T10:00:00").unwrap(),
            CellValue::Text("2021-01-01T10:00:00".to_string())
        );

        let resolver = CellResolver::new(&shared, &styles, true, "%Y-%m-%d");
        assert_eq!(
            resolver.coerce(CellType::Date, "42735").unwrap(),
            CellValue::Date("2021-01-01".to_string())
        );
    }

    #[test]
    fn test_coerce_boolean_and_number() {
        let (styles, shared) = (styles(), shared());
        let resolver = CellResolver::new(&shared, &styles, false, DEFAULT_DATE_FORMAT);
        assert_eq!(resolver.coerce(CellType::Boolean, "1").unwrap(), CellValue::Bool(true));
        assert_eq!(resolver.coerce(CellType::Boolean, "0").unwrap(), CellValue::Bool(false));
        assert_eq!(resolver.coerce(CellType::Number, "42").unwrap(), CellValue::Int(42));
        assert_eq!(resolver.coerce(CellType::Number, "12.50").unwrap(), CellValue::Float(12.5));
        assert_eq!(
            resolver.coerce(CellType::Text, "hello").unwrap(),
            CellValue::Text("hello".to_string())
        );
        assert_eq!(resolver.coerce(CellType::Text, "7").unwrap(), CellValue::Int(7));
    }

    #[test]
    fn test_invalid_style_index() {
        let (styles, shared) = (styles(), shared());
        let resolver = CellResolver::new(&shared, &styles, false, DEFAULT_DATE_FORMAT);
        assert_eq!(resolver.cell_type(None, Some("1")).unwrap(), CellType::Date);
        assert!(matches!(
            resolver.cell_type(None, Some("-1")),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_display_and_json() {
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Float(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Empty.to_string(), "");

        let row: Row = vec![
            CellValue::Text("a".to_string()),
            CellValue::Int(1),
            CellValue::Float(2.5),
            CellValue::Bool(false),
            CellValue::Empty,
        ];
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"["a",1,2.5,false,null]"#
        );
    }
}
