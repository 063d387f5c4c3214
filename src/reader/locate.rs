//! Line alignment over a [`ByteSource`].
//!
//! Every offset the search and partitioning code produces is snapped to a
//! line start through [`LineLocator`] before anything is parsed. Searches map
//! a small window around the offset and double it until a terminator (or the
//! end of the file) turns up, so no maximum line length is assumed.

use super::{ByteSource, LineSpan};
use crate::error::Result;

/// Initial window for terminator searches
pub const DEFAULT_LOCATE_WINDOW: usize = 64 * 1024;

#[derive(Clone, Copy)]
pub struct LineLocator<'a> {
    source: &'a dyn ByteSource,
    window: usize,
}

impl<'a> LineLocator<'a> {
    pub fn new(source: &'a dyn ByteSource, window: usize) -> Self {
        Self {
            source,
            window: window.max(1),
        }
    }

    pub fn source(&self) -> &'a dyn ByteSource {
        self.source
    }

    /// Span of the first line starting at or after `offset`.
    ///
    /// An offset sitting on a `\n` yields the following line. Returns `None`
    /// when no line starts in `[offset, len)`.
    pub fn align_forward(&self, offset: u64) -> Result<Option<LineSpan>> {
        let Some(start) = self.next_line_start(offset)? else {
            return Ok(None);
        };
        let end = self.line_end(start)?;
        Ok(Some(LineSpan { start, end }))
    }

    /// Span of the line containing `offset`, or `None` past the end.
    pub fn line_containing(&self, offset: u64) -> Result<Option<LineSpan>> {
        if offset >= self.source.len() {
            return Ok(None);
        }
        let start = match self.find_backward(offset)? {
            Some(newline) => newline + 1,
            None => 0,
        };
        let end = self.line_end(start)?;
        Ok(Some(LineSpan { start, end }))
    }

    /// Span of the line ending right before `line_start`, if any.
    pub fn previous_line(&self, line_start: u64) -> Result<Option<LineSpan>> {
        if line_start == 0 {
            return Ok(None);
        }
        self.line_containing(line_start - 1)
    }

    /// First line start at or after `offset`, or `None` at end of file.
    pub fn next_line_start(&self, offset: u64) -> Result<Option<u64>> {
        let len = self.source.len();
        if offset >= len {
            return Ok(None);
        }
        if offset == 0 {
            return Ok(Some(0));
        }
        // `offset` is a line start exactly when the byte before it is `\n`
        let start = match self.find_forward(offset - 1)? {
            Some(newline) => newline + 1,
            None => return Ok(None),
        };
        Ok((start < len).then_some(start))
    }

    /// Like [`LineLocator::next_line_start`] but clamps to the file length.
    pub fn snap_forward(&self, offset: u64) -> Result<u64> {
        Ok(self
            .next_line_start(offset)?
            .unwrap_or_else(|| self.source.len()))
    }

    /// End (exclusive, past the terminator) of the line starting at `start`.
    pub fn line_end(&self, start: u64) -> Result<u64> {
        Ok(match self.find_forward(start)? {
            Some(newline) => newline + 1,
            None => self.source.len(),
        })
    }

    /// Position of the first `\n` at or after `from`.
    fn find_forward(&self, from: u64) -> Result<Option<u64>> {
        let len = self.source.len();
        let mut pos = from;
        let mut size = self.window as u64;

        while pos < len {
            let end = pos.saturating_add(size).min(len);
            let view = self.source.map_range(pos, end)?;
            if let Some(idx) = memchr::memchr(b'\n', &view) {
                return Ok(Some(pos + idx as u64));
            }
            pos = end;
            size = size.saturating_mul(2);
        }
        Ok(None)
    }

    /// Position of the last `\n` strictly before `before`.
    fn find_backward(&self, before: u64) -> Result<Option<u64>> {
        let mut end = before.min(self.source.len());
        let mut size = self.window as u64;

        while end > 0 {
            let start = end.saturating_sub(size);
            let view = self.source.map_range(start, end)?;
            if let Some(idx) = memchr::memrchr(b'\n', &view) {
                return Ok(Some(start + idx as u64));
            }
            end = start;
            size = size.saturating_mul(2);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MemorySource;

    // "aaa\nbb\n\ncccc" -> lines at 0..4, 4..7, 7..8, 8..12
    fn sample() -> MemorySource {
        MemorySource::new("aaa\nbb\n\ncccc")
    }

    fn span(start: u64, end: u64) -> Option<LineSpan> {
        Some(LineSpan { start, end })
    }

    #[test]
    fn test_align_forward_on_line_start() {
        let source = sample();
        let locator = LineLocator::new(&source, 2);
        assert_eq!(locator.align_forward(0).unwrap(), span(0, 4));
        assert_eq!(locator.align_forward(4).unwrap(), span(4, 7));
        assert_eq!(locator.align_forward(7).unwrap(), span(7, 8));
        assert_eq!(locator.align_forward(8).unwrap(), span(8, 12));
    }

    #[test]
    fn test_align_forward_mid_line_and_on_terminator() {
        let source = sample();
        let locator = LineLocator::new(&source, 2);
        assert_eq!(locator.align_forward(1).unwrap(), span(4, 7));
        // Offset 3 is the terminator of the first line
        assert_eq!(locator.align_forward(3).unwrap(), span(4, 7));
        assert_eq!(locator.align_forward(9).unwrap(), None);
        assert_eq!(locator.align_forward(12).unwrap(), None);
        assert_eq!(locator.align_forward(500).unwrap(), None);
    }

    #[test]
    fn test_line_containing() {
        let source = sample();
        let locator = LineLocator::new(&source, 1);
        assert_eq!(locator.line_containing(0).unwrap(), span(0, 4));
        assert_eq!(locator.line_containing(3).unwrap(), span(0, 4));
        assert_eq!(locator.line_containing(5).unwrap(), span(4, 7));
        assert_eq!(locator.line_containing(7).unwrap(), span(7, 8));
        assert_eq!(locator.line_containing(11).unwrap(), span(8, 12));
        assert_eq!(locator.line_containing(12).unwrap(), None);
    }

    #[test]
    fn test_previous_line() {
        let source = sample();
        let locator = LineLocator::new(&source, 3);
        assert_eq!(locator.previous_line(0).unwrap(), None);
        assert_eq!(locator.previous_line(4).unwrap(), span(0, 4));
        assert_eq!(locator.previous_line(8).unwrap(), span(7, 8));
    }

    #[test]
    fn test_long_line_grows_window() {
        let mut data = "x".repeat(10_000);
        data.push('\n');
        data.push_str("tail\n");
        let source = MemorySource::new(data);
        let locator = LineLocator::new(&source, 4);

        assert_eq!(locator.align_forward(17).unwrap(), span(10_001, 10_006));
        assert_eq!(locator.line_containing(9_000).unwrap(), span(0, 10_001));
    }

    #[test]
    fn test_snap_forward_clamps_to_len() {
        let source = sample();
        let locator = LineLocator::new(&source, 2);
        assert_eq!(locator.snap_forward(5).unwrap(), 7);
        assert_eq!(locator.snap_forward(10).unwrap(), 12);
    }

    #[test]
    fn test_empty_source() {
        let source = MemorySource::new(Vec::<u8>::new());
        let locator = LineLocator::new(&source, 2);
        assert_eq!(locator.align_forward(0).unwrap(), None);
        assert_eq!(locator.line_containing(0).unwrap(), None);
        assert_eq!(locator.snap_forward(0).unwrap(), 0);
    }
}
