//! Output sinks and line formatting.

use crate::scan::MatchedLine;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::{self, Write};

/// How matched lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lines exactly as they appear in the log
    Raw,
    /// `2024-06-15T02:49:15.0000 - INFO - msg` becomes
    /// `2024-06-15 02:49:15 INFO msg`; surrounding whitespace is trimmed
    #[default]
    Compact,
}

/// Receives matched lines in final order, one call per line.
pub trait LineSink {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;
}

impl LineSink for Vec<Vec<u8>> {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.push(line.to_vec());
        Ok(())
    }
}

/// Sink over any writer; terminates every line with `\n`.
pub struct WriterSink<W: Write> {
    writer: W,
    format: OutputFormat,
    lines: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            lines: 0,
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self.format {
            OutputFormat::Raw => self.writer.write_all(line)?,
            OutputFormat::Compact => self.writer.write_all(&format_compact(line))?,
        }
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }
}

/// Write `lines` to `sink` in order. Flushing is left to the caller.
pub fn write_lines(lines: &[MatchedLine], sink: &mut dyn LineSink) -> io::Result<()> {
    for line in lines {
        sink.write_line(&line.bytes)?;
    }
    Ok(())
}

const FIELD_SEPARATOR: &[u8] = b" - ";
const ZERO_FRACTION: &[u8] = b".0000";

/// Compact rendering of a `<timestamp> - <field> - <rest>` line.
///
/// Leading and trailing whitespace is trimmed first. The timestamp's `T`
/// becomes a space and every `.0000` in it is removed; the three parts are
/// joined by single spaces. Lines of any other shape come back trimmed but
/// otherwise unchanged.
pub fn format_compact(line: &[u8]) -> Cow<'_, [u8]> {
    let line = line.trim_ascii();
    if memchr::memchr(b'T', line).is_none() {
        return Cow::Borrowed(line);
    }
    let Some(first) = memchr::memmem::find(line, FIELD_SEPARATOR) else {
        return Cow::Borrowed(line);
    };
    let after_first = first + FIELD_SEPARATOR.len();
    let Some(second) = memchr::memmem::find(&line[after_first..], FIELD_SEPARATOR) else {
        return Cow::Borrowed(line);
    };
    let second = after_first + second;

    let mut out = Vec::with_capacity(line.len());
    push_timestamp(&mut out, &line[..first]);
    out.push(b' ');
    out.extend_from_slice(&line[after_first..second]);
    out.push(b' ');
    out.extend_from_slice(&line[second + FIELD_SEPARATOR.len()..]);
    Cow::Owned(out)
}

fn push_timestamp(out: &mut Vec<u8>, timestamp: &[u8]) {
    let mut rest = timestamp;
    while let Some(at) = memchr::memmem::find(rest, ZERO_FRACTION) {
        push_spaced(out, &rest[..at]);
        rest = &rest[at + ZERO_FRACTION.len()..];
    }
    push_spaced(out, rest);
}

fn push_spaced(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend(bytes.iter().map(|&b| if b == b'T' { b' ' } else { b }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact(line: &str) -> String {
        String::from_utf8(format_compact(line.as_bytes()).into_owned()).unwrap()
    }

    #[test]
    fn test_compact_standard_line() {
        assert_eq!(
            compact("2024-06-15T02:49:15.0000 - INFO - User logged in"),
            "2024-06-15 02:49:15 INFO User logged in"
        );
    }

    #[test]
    fn test_compact_keeps_real_fraction() {
        assert_eq!(
            compact("2024-06-15T02:49:15.1250 - WARN - slow"),
            "2024-06-15 02:49:15.1250 WARN slow"
        );
    }

    #[test]
    fn test_compact_drops_only_four_zero_fraction() {
        assert_eq!(
            compact("2024-06-15T02:49:15.000 - INFO - short fraction"),
            "2024-06-15 02:49:15.000 INFO short fraction"
        );
        assert_eq!(
            compact("2024-06-15T02:49:15.000000 - INFO - long fraction"),
            "2024-06-15 02:49:1500 INFO long fraction"
        );
    }

    #[test]
    fn test_compact_trims_whitespace() {
        assert_eq!(
            compact("  2024-06-15T02:49:15.0000 - INFO - crlf line \r"),
            "2024-06-15 02:49:15 INFO crlf line"
        );
        assert_eq!(compact("2024-06-15 plain message \r"), "2024-06-15 plain message");
    }

    #[test]
    fn test_compact_rest_keeps_separators() {
        assert_eq!(
            compact("2024-06-15T00:00:00.0000 - ERROR - a - b - c"),
            "2024-06-15 00:00:00 ERROR a - b - c"
        );
    }

    #[test]
    fn test_compact_passes_other_shapes_through() {
        for line in [
            "2024-06-15 plain message",
            "2024-06-15T00:00:00 - only two parts",
            "",
        ] {
            assert!(matches!(format_compact(line.as_bytes()), Cow::Borrowed(_)));
            assert_eq!(compact(line), line);
        }
    }

    #[test]
    fn test_writer_sink_formats_and_terminates() {
        let mut sink = WriterSink::new(Vec::new(), OutputFormat::Compact);
        sink.write_line(b"2024-06-15T02:49:15.0000 - INFO - hi").unwrap();
        sink.write_line(b"trailing").unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.lines_written(), 2);
        assert_eq!(
            sink.into_inner(),
            b"2024-06-15 02:49:15 INFO hi\ntrailing\n".to_vec()
        );
    }

    #[test]
    fn test_raw_sink_is_verbatim() {
        let mut sink = WriterSink::new(Vec::new(), OutputFormat::Raw);
        sink.write_line(b"2024-06-15T02:49:15.0000 - INFO - hi").unwrap();
        assert_eq!(sink.into_inner(), b"2024-06-15T02:49:15.0000 - INFO - hi\n".to_vec());
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: OutputFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(format, OutputFormat::Compact);
        assert_eq!(OutputFormat::default(), OutputFormat::Compact);
    }
}
