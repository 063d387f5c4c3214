use super::{ByteSource, MappedRange};
use crate::error::{ExtractError, Result};
use std::io;
use std::sync::Arc;

/// In-memory [`ByteSource`], used for tests and for input that was already
/// read into memory.
#[derive(Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::from(data.into()),
        }
    }

    /// Build a source from lines, each terminated with `\n`.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut data = Vec::new();
        for line in lines {
            data.extend_from_slice(line.as_ref().as_bytes());
            data.push(b'\n');
        }
        Self::new(data)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn map_range(&self, start: u64, end: u64) -> Result<MappedRange> {
        let end = end.min(self.len());
        if start > end {
            return Err(ExtractError::MapFailure {
                start,
                end,
                source: io::Error::new(io::ErrorKind::InvalidInput, "range past end of data"),
            });
        }
        Ok(MappedRange::shared(
            start,
            Arc::clone(&self.data),
            start as usize,
            end as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_terminates_each_line() {
        let source = MemorySource::from_lines(&["a", "bc"]);
        assert_eq!(source.bytes(), b"a\nbc\n");
        assert_eq!(source.len(), 5);
    }

    #[test]
    fn test_map_range() {
        let source = MemorySource::new("hello world");
        assert_eq!(&source.map_range(6, 11).unwrap()[..], b"world");
        assert_eq!(&source.map_range(6, 99).unwrap()[..], b"world");
        assert!(source.map_range(12, 13).is_err());
    }
}
