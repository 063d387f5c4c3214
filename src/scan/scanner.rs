use super::{Chunk, ChunkMatches, MatchedLine};
use crate::context::RunContext;
use crate::error::{ExtractError, Result};
use crate::reader::for_each_line;
use crate::timestamp::{parse_line_date, LineDate};
use std::ops::ControlFlow;

/// Lines between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Collect the target date's lines from one chunk, in order.
///
/// Every line is parsed independently, so chunks do not depend on dates being
/// ordered. Malformed lines are counted and skipped. Returns
/// [`ExtractError::Cancelled`] if another worker raised the run's cancel
/// token while this chunk was in progress.
pub fn scan_chunk(ctx: &RunContext, chunk: &Chunk) -> Result<ChunkMatches> {
    let target = ctx.target();
    let cancel = ctx.cancel();
    let mut result = ChunkMatches::new(chunk.start);
    let mut cancelled = cancel.is_cancelled();

    if !cancelled {
        for_each_line(
            ctx.source(),
            chunk.range(),
            ctx.options().scan_window,
            |offset, line| {
                result.lines_scanned += 1;
                if result.lines_scanned % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                    cancelled = true;
                    return ControlFlow::Break(());
                }

                let date = parse_line_date(line);
                if date == LineDate::Malformed {
                    result.malformed += 1;
                } else if target.matches(date) {
                    result.lines.push(MatchedLine::new(offset, line));
                }
                ControlFlow::Continue(())
            },
        )?;
    }

    if cancelled {
        return Err(ExtractError::Cancelled);
    }
    Ok(result)
}
