//! Sequential line iteration over a byte range, one mapped window at a time.
//!
//! Same approach as a grep-style streaming pass (memchr over mapped memory),
//! but the range is mapped in bounded windows instead of all at once. A window
//! is cut at its last newline; the partial line behind the cut starts the next
//! window. A line longer than the window grows the window until it fits.

use super::{line_content, ByteRange, ByteSource};
use crate::error::Result;
use std::ops::ControlFlow;

/// Default window for sequential scans (8 MiB)
pub const DEFAULT_SCAN_WINDOW: usize = 8 * 1024 * 1024;

/// Call `visit(offset, line)` for every line in `range`, in order.
///
/// `range.start` must be a line start and `range.end` a line start or the
/// source length. Lines are passed without their terminator. Returning
/// `ControlFlow::Break` stops the walk early.
pub fn for_each_line<F>(
    source: &dyn ByteSource,
    range: ByteRange,
    window: usize,
    mut visit: F,
) -> Result<()>
where
    F: FnMut(u64, &[u8]) -> ControlFlow<()>,
{
    let base_window = window.max(1) as u64;
    let mut size = base_window;
    let mut pos = range.start;

    while pos < range.end {
        let end = pos.saturating_add(size).min(range.end);
        let view = source.map_range(pos, end)?;
        let bytes = &view[..];

        // Only whole lines are visited; the tail after the last newline is
        // re-read by the next window unless this window reaches the range end.
        let complete = if end == range.end {
            bytes.len()
        } else {
            match memchr::memrchr(b'\n', bytes) {
                Some(idx) => idx + 1,
                None => {
                    size = size.saturating_mul(2);
                    continue;
                }
            }
        };

        let mut cursor = 0usize;
        while cursor < complete {
            let line_end = memchr::memchr(b'\n', &bytes[cursor..complete])
                .map(|idx| cursor + idx + 1)
                .unwrap_or(complete);

            let line = line_content(&bytes[cursor..line_end]);
            if visit(pos + cursor as u64, line).is_break() {
                return Ok(());
            }
            cursor = line_end;
        }

        pos += complete as u64;
        size = base_window;
    }

    Ok(())
}
