//! Spreadsheet date serial conversion.
//!
//! A serial is a day count with the time of day as its fraction. Conversion
//! goes through signed Unix seconds and is then rendered as a UTC timestamp.
//! Serial 25569 is 1970-01-01 in the 1900 date system. The same constant is
//! used for every serial, so days before 1900-03-01 land one day early, which
//! keeps the phantom 1900-02-29 (serial 60) consistent with the reference
//! application's arithmetic.

use crate::error::{Error, Result};
use chrono::DateTime;
use std::fmt::Write;

/// Serial number of 1970-01-01 in the 1900 date system.
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// Days between the 1900 and 1904 date system origins.
pub const DATE1904_OFFSET: f64 = 1462.0;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Default timestamp layout, `YYYY-MM-DD HH:MM:SS`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Convert a serial to signed seconds since the Unix epoch.
///
/// A serial whose day part is zero is a pure time of day and maps onto
/// 1970-01-01.
pub fn serial_to_unix_seconds(serial: f64, date1904: bool) -> Result<i64> {
    if !serial.is_finite() {
        return Err(Error::MalformedDocument(format!(
            "date serial {} is not a finite number",
            serial
        )));
    }

    let mut days = serial.floor();
    let time = serial - days;

    if date1904 {
        days += DATE1904_OFFSET;
    }

    let time_seconds = (time * SECONDS_PER_DAY).round();
    let seconds = if days != 0.0 {
        (days - UNIX_EPOCH_SERIAL) * SECONDS_PER_DAY + time_seconds
    } else {
        time_seconds
    };

    if seconds < i64::MIN as f64 || seconds > i64::MAX as f64 {
        return Err(Error::MalformedDocument(format!(
            "date serial {} out of range",
            serial
        )));
    }

    Ok(seconds as i64)
}

/// Convert a serial to a UTC timestamp rendered with `format` (strftime
/// syntax, see [`DEFAULT_DATE_FORMAT`]).
pub fn format_serial(serial: f64, date1904: bool, format: &str) -> Result<String> {
    let seconds = serial_to_unix_seconds(serial, date1904)?;
    let datetime = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        Error::MalformedDocument(format!("date serial {} out of range", serial))
    })?;

    let mut out = String::new();
    write!(out, "{}", datetime.format(format))
        .map_err(|_| Error::InvalidArgument(format!("invalid date format: {}", format)))?;
    Ok(out)
}
