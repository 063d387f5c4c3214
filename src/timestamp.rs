//! Date prefix parsing for log lines.
//!
//! Lines are expected to start with an ISO-8601 date (`2024-06-15`), usually
//! followed by a time (`2024-06-15T02:49:15.0000`). Anything else is reported
//! as [`LineDate::Malformed`] and treated as a gap by every caller.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the `YYYY-MM-DD` prefix.
pub const DATE_LEN: usize = 10;

/// Outcome of parsing the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDate {
    Parsed(NaiveDate),
    Malformed,
}

impl LineDate {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            LineDate::Parsed(date) => Some(date),
            LineDate::Malformed => None,
        }
    }
}

/// Parse the date prefix of `line`.
///
/// Leading ASCII whitespace is skipped. The date must be followed by the end
/// of the line or a non-digit separator (`T`, space, ...).
pub fn parse_line_date(line: &[u8]) -> LineDate {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let rest = &line[start..];

    if rest.len() < DATE_LEN {
        return LineDate::Malformed;
    }
    if rest.get(DATE_LEN).is_some_and(|b| b.is_ascii_digit()) {
        return LineDate::Malformed;
    }

    match parse_date(&rest[..DATE_LEN]) {
        Some(date) => LineDate::Parsed(date),
        None => LineDate::Malformed,
    }
}

/// Parse exactly `YYYY-MM-DD`.
fn parse_date(bytes: &[u8]) -> Option<NaiveDate> {
    if bytes.len() != DATE_LEN || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let year = digits(&bytes[0..4])?;
    let month = digits(&bytes[5..7])?;
    let day = digits(&bytes[8..10])?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn digits(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid date in YYYY-MM-DD format")]
pub struct InvalidDate(pub String);

/// The calendar date being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetDate(NaiveDate);

impl TargetDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Ordering of a line's date relative to the target: `Less` for lines
    /// before the target day.
    pub fn cmp_line(&self, line_date: NaiveDate) -> Ordering {
        line_date.cmp(&self.0)
    }

    pub fn matches(&self, line: LineDate) -> bool {
        line == LineDate::Parsed(self.0)
    }
}

impl FromStr for TargetDate {
    type Err = InvalidDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_date(s.as_bytes())
            .map(TargetDate)
            .ok_or_else(|| InvalidDate(s.to_string()))
    }
}

impl fmt::Display for TargetDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl Serialize for TargetDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_timestamp() {
        assert_eq!(
            parse_line_date(b"2024-12-01T02:49:15.0000 - INFO - started"),
            LineDate::Parsed(ymd(2024, 12, 1))
        );
    }

    #[test]
    fn test_parse_space_separated_and_bare_date() {
        assert_eq!(
            parse_line_date(b"2024-02-29 23:59:59 WARN disk"),
            LineDate::Parsed(ymd(2024, 2, 29))
        );
        assert_eq!(
            parse_line_date(b"2024-02-29"),
            LineDate::Parsed(ymd(2024, 2, 29))
        );
    }

    #[test]
    fn test_leading_whitespace_is_skipped() {
        assert_eq!(
            parse_line_date(b"  \t2024-01-05T00:00:00"),
            LineDate::Parsed(ymd(2024, 1, 5))
        );
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            &b""[..],
            b"   ",
            b"2024-06",
            b"INFO 2024-06-15 late date",
            b"2024/06/15 slashes",
            b"2024-13-01 bad month",
            b"2023-02-29 not a leap year",
            b"20240-06-15 five digit year",
            b"2024-06-150",
            b"\xff\xfe garbage",
        ] {
            assert_eq!(
                parse_line_date(line),
                LineDate::Malformed,
                "{:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn test_target_date_from_str() {
        let target: TargetDate = "2024-06-15".parse().unwrap();
        assert_eq!(target.date(), ymd(2024, 6, 15));
        assert_eq!(target.to_string(), "2024-06-15");
    }

    #[test]
    fn test_target_date_rejects_loose_formats() {
        for input in ["2024-6-15", "2024-06-15T00:00", "", "2024-02-30", "june"] {
            let err = input.parse::<TargetDate>().unwrap_err();
            assert_eq!(err, InvalidDate(input.to_string()));
        }
    }

    #[test]
    fn test_target_matches_and_orders() {
        let target: TargetDate = "2024-06-15".parse().unwrap();
        assert!(target.matches(parse_line_date(b"2024-06-15T10:00:00 x")));
        assert!(!target.matches(parse_line_date(b"2024-06-16T10:00:00 x")));
        assert!(!target.matches(LineDate::Malformed));
        assert_eq!(target.cmp_line(ymd(2024, 6, 14)), Ordering::Less);
        assert_eq!(target.cmp_line(ymd(2024, 6, 15)), Ordering::Equal);
        assert_eq!(target.cmp_line(ymd(2025, 1, 1)), Ordering::Greater);
    }

    #[test]
    fn test_target_serializes_as_string() {
        let target: TargetDate = "2024-01-02".parse().unwrap();
        assert_eq!(serde_json::to_string(&target).unwrap(), "\"2024-01-02\"");
    }
}
