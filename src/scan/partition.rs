//! Line-aligned chunking of the ranges left for the scan workers.

use crate::error::Result;
use crate::reader::{ByteRange, LineLocator};
use serde::Serialize;

/// Contiguous, line-aligned byte range scanned by one worker.
///
/// `start` is a line start; `end` is a line start or the end of the file.
/// Chunk ids follow file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub id: usize,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `regions` into chunks for `workers` scanners.
///
/// Each region gets a share of the chunks proportional to its size (at least
/// one), and more when `max_chunk_bytes` caps the chunk size. Nominal cut
/// points are snapped forward to the next line start, so chunks tile every
/// region exactly and no line is split. Cuts that collapse onto each other
/// simply drop the empty chunk.
pub fn partition(
    locator: &LineLocator<'_>,
    regions: &[ByteRange],
    workers: usize,
    max_chunk_bytes: Option<u64>,
) -> Result<Vec<Chunk>> {
    let total: u64 = regions.iter().map(ByteRange::len).sum();
    let workers = workers.max(1) as u64;
    let mut chunks = Vec::new();

    for region in regions.iter().filter(|r| !r.is_empty()) {
        let pieces = piece_count(region.len(), total, workers, max_chunk_bytes);
        let mut start = region.start;

        for k in 1..=pieces {
            let end = if k == pieces {
                region.end
            } else {
                let nominal = region.start + nominal_offset(region.len(), k, pieces);
                locator.snap_forward(nominal)?.clamp(start, region.end)
            };
            if end > start {
                chunks.push(Chunk {
                    id: chunks.len(),
                    start,
                    end,
                });
                start = end;
            }
        }
    }

    Ok(chunks)
}

fn piece_count(len: u64, total: u64, workers: u64, max_chunk_bytes: Option<u64>) -> u64 {
    let share = ((workers as u128 * len as u128).div_ceil(total.max(1) as u128)) as u64;
    let capped = match max_chunk_bytes {
        Some(max) if max > 0 => share.max(len.div_ceil(max)),
        _ => share,
    };
    capped.clamp(1, len.max(1))
}

fn nominal_offset(len: u64, k: u64, pieces: u64) -> u64 {
    (len as u128 * k as u128 / pieces as u128) as u64
}
