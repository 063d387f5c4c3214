pub mod locate;
pub mod memory_source;
pub mod mmap_source;
pub mod walk;

pub use locate::LineLocator;
pub use memory_source::MemorySource;
pub use mmap_source::MmapSource;
pub use walk::for_each_line;

use crate::error::Result;
use memmap2::Mmap;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;

/// Read-only byte access to a log file.
///
/// Implementations must be shareable between scan workers. Views returned by
/// [`ByteSource::map_range`] stay valid while held and release their memory
/// when dropped, so callers keep them short-lived.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map `[start, end)` read-only. `end` is clamped to [`ByteSource::len`].
    fn map_range(&self, start: u64, end: u64) -> Result<MappedRange>;
}

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "inverted range {}..{}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Byte span of exactly one line.
///
/// `end` is one past the line's `\n`, or the file length for an unterminated
/// last line, so consecutive spans tile the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: u64,
    pub end: u64,
}

impl LineSpan {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Strip the line terminator (`\n` or `\r\n`) from a line slice.
pub fn line_content(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Bytes of a mapped range. Dropping the view unmaps file-backed memory.
pub struct MappedRange {
    start: u64,
    bytes: ViewBytes,
}

enum ViewBytes {
    Empty,
    Mapped(Mmap),
    Shared { data: Arc<[u8]>, from: usize, to: usize },
}

impl MappedRange {
    pub(crate) fn empty(start: u64) -> Self {
        Self {
            start,
            bytes: ViewBytes::Empty,
        }
    }

    pub(crate) fn mapped(start: u64, mmap: Mmap) -> Self {
        Self {
            start,
            bytes: ViewBytes::Mapped(mmap),
        }
    }

    pub(crate) fn shared(start: u64, data: Arc<[u8]>, from: usize, to: usize) -> Self {
        Self {
            start,
            bytes: ViewBytes::Shared { data, from, to },
        }
    }

    /// File offset of the first byte in the view
    pub fn start(&self) -> u64 {
        self.start
    }

    /// File offset one past the last byte in the view
    pub fn end(&self) -> u64 {
        self.start + self.len() as u64
    }
}

impl Deref for MappedRange {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.bytes {
            ViewBytes::Empty => &[],
            ViewBytes::Mapped(mmap) => &mmap[..],
            ViewBytes::Shared { data, from, to } => &data[*from..*to],
        }
    }
}

impl std::fmt::Debug for MappedRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRange")
            .field("start", &self.start)
            .field("len", &self.len())
            .finish()
    }
}
