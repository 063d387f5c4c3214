use super::{ByteSource, MappedRange};
use crate::error::{ExtractError, Result};
use memmap2::MmapOptions;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// File-backed [`ByteSource`] that maps windows of the file on demand.
///
/// Nothing is mapped up front: each [`ByteSource::map_range`] call creates a
/// fresh read-only mapping covering just the requested range, and dropping
/// the returned view unmaps it. Memory use therefore follows the windows the
/// callers hold, not the file size.
pub struct MmapSource {
    path: PathBuf,
    file: File,
    len: u64,
}

impl MmapSource {
    /// Open `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| open_error(&path, e))?;
        let len = file.metadata().map_err(|e| open_error(&path, e))?.len();

        Ok(Self { path, file, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_error(path: &Path, source: io::Error) -> ExtractError {
    let path = path.to_path_buf();
    match source.kind() {
        io::ErrorKind::NotFound => ExtractError::NotFound { path },
        io::ErrorKind::PermissionDenied => ExtractError::AccessDenied { path },
        _ => ExtractError::Io { path, source },
    }
}

impl ByteSource for MmapSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn map_range(&self, start: u64, end: u64) -> Result<MappedRange> {
        let end = end.min(self.len);
        if start > end {
            return Err(ExtractError::MapFailure {
                start,
                end,
                source: io::Error::new(io::ErrorKind::InvalidInput, "range past end of file"),
            });
        }
        // Zero-length mappings are rejected by mmap(2)
        if start == end {
            return Ok(MappedRange::empty(start));
        }

        let len = usize::try_from(end - start).map_err(|_| ExtractError::MapFailure {
            start,
            end,
            source: io::Error::new(io::ErrorKind::InvalidInput, "range exceeds address space"),
        })?;

        // SAFETY: the mapping is read-only and the file is treated as
        // append-only for the duration of the run.
        let mmap = unsafe { MmapOptions::new().offset(start).len(len).map(&self.file) }
            .map_err(|source| ExtractError::MapFailure { start, end, source })?;

        Ok(MappedRange::mapped(start, mmap))
    }
}
