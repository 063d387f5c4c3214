//! Partitioning, parallel scanning and merging of everything outside the hot
//! region.

pub mod aggregate;
pub mod cancel;
pub mod partition;
pub mod pool;
pub mod scanner;

pub use aggregate::Aggregator;
pub use cancel::CancelToken;
pub use partition::{partition, Chunk};
pub use pool::ScanPool;
pub use scanner::scan_chunk;

use std::borrow::Cow;

/// A line of the target date, copied out of the mapped file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLine {
    /// File offset of the line start
    pub offset: u64,
    /// Line content without terminator
    pub bytes: Vec<u8>,
}

impl MatchedLine {
    pub fn new(offset: u64, bytes: &[u8]) -> Self {
        Self {
            offset,
            bytes: bytes.to_vec(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Matches from one contiguous byte range, tagged with the range start so
/// fragments can be put back in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMatches {
    pub start: u64,
    pub lines: Vec<MatchedLine>,
    pub lines_scanned: u64,
    pub malformed: u64,
}

impl ChunkMatches {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }
}
