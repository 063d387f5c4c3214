//! Range estimation: bracket the target date with binary searches over byte
//! offsets.
//!
//! Each probe snaps an offset to the next line start, reads just enough of
//! the line to parse its date prefix and compares it with the target. Two
//! searches run back to back: the lower one finds an offset before which no
//! line can match, the upper one an offset from which no line can match.
//! Both rely on dates being non-decreasing through the file; the refiner
//! checks that assumption on the bytes it scans.

use crate::context::RunContext;
use crate::error::{ExtractError, Result};
use crate::reader::{ByteSource, LineLocator, LineSpan};
use crate::timestamp::{parse_line_date, LineDate};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Bytes read from a probed line; the date prefix sits at its start.
const PROBE_PREFIX_BYTES: u64 = 256;

/// `[low, high]` bracket believed to hold every line of the target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchWindow {
    pub low: u64,
    pub high: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// Window after widening by the safety margin
    pub window: SearchWindow,
    /// Window straight out of the binary searches
    pub raw: SearchWindow,
    pub probes: usize,
    /// Probes that landed on a line of the target date
    pub hits: usize,
    /// Width of the window at the last probe
    pub last_stride: u64,
}

/// First and last parseable dates in the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateBounds {
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

pub(crate) enum Probe {
    Dated { span: LineSpan, date: NaiveDate },
    /// No parseable line starts before the search limit
    Exhausted,
}

/// Binary search driver shared by the estimator and the refiner.
pub(crate) struct Prober<'a> {
    ctx: &'a RunContext,
    locator: LineLocator<'a>,
    pub probes: usize,
    pub hits: usize,
}

impl<'a> Prober<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            ctx,
            locator: ctx.locator(),
            probes: 0,
            hits: 0,
        }
    }

    /// First parseable line starting in `[from, limit)`.
    ///
    /// Steps over at most `max_probe_skip` malformed lines before giving up
    /// with [`ExtractError::EstimationFailure`].
    pub fn probe(&mut self, from: u64, limit: u64) -> Result<Probe> {
        self.probes += 1;
        if self.probes > self.ctx.options().max_probes {
            return Err(ExtractError::EstimationFailure {
                offset: from,
                skipped: 0,
            });
        }

        let budget = self.ctx.options().max_probe_skip;
        let mut offset = from;
        let mut skipped = 0usize;

        loop {
            let Some(span) = self.locator.align_forward(offset)? else {
                return Ok(Probe::Exhausted);
            };
            if span.start >= limit {
                return Ok(Probe::Exhausted);
            }
            match read_date(self.locator.source(), span)? {
                LineDate::Parsed(date) => return Ok(Probe::Dated { span, date }),
                LineDate::Malformed => {
                    skipped += 1;
                    if skipped > budget {
                        return Err(ExtractError::EstimationFailure {
                            offset: from,
                            skipped,
                        });
                    }
                    offset = span.end;
                }
            }
        }
    }

    /// Narrow `[lo, hi)` to an offset before which no line of the target
    /// date starts. Returns the offset and the last probe stride.
    pub fn lower_bound(&mut self, mut lo: u64, mut hi: u64) -> Result<(u64, u64)> {
        let target = self.ctx.target();
        let min = self.ctx.options().min_search_window.max(1);
        let mut stride = 0;

        while hi.saturating_sub(lo) > min {
            let mid = lo + (hi - lo) / 2;
            stride = mid - lo;
            match self.probe(mid, hi)? {
                Probe::Exhausted => hi = mid,
                Probe::Dated { span, date } => match target.cmp_line(date) {
                    Ordering::Less => lo = span.end,
                    Ordering::Equal => {
                        self.hits += 1;
                        hi = mid;
                    }
                    Ordering::Greater => hi = mid,
                },
            }
        }
        Ok((lo, stride))
    }

    /// Narrow `[lo, hi)` to an offset at or after which no line of the
    /// target date starts. Returns the offset and the last probe stride.
    pub fn upper_bound(&mut self, mut lo: u64, mut hi: u64) -> Result<(u64, u64)> {
        let target = self.ctx.target();
        let min = self.ctx.options().min_search_window.max(1);
        let mut stride = 0;

        while hi.saturating_sub(lo) > min {
            let mid = lo + (hi - lo) / 2;
            stride = mid - lo;
            match self.probe(mid, hi)? {
                Probe::Exhausted => hi = mid,
                Probe::Dated { span, date } => match target.cmp_line(date) {
                    Ordering::Greater => hi = mid,
                    Ordering::Equal => {
                        self.hits += 1;
                        lo = span.end;
                    }
                    Ordering::Less => lo = span.end,
                },
            }
        }
        Ok((hi, stride))
    }

    pub fn margin(&self, stride: u64) -> u64 {
        stride
            .max(self.ctx.options().min_search_window)
            .saturating_mul(self.ctx.options().margin_factor)
    }
}

fn read_date(source: &dyn ByteSource, span: LineSpan) -> Result<LineDate> {
    let end = span.end.min(span.start.saturating_add(PROBE_PREFIX_BYTES));
    let view = source.map_range(span.start, end)?;
    Ok(parse_line_date(&view))
}

/// Bracket the target date's region of the file.
pub fn estimate(ctx: &RunContext) -> Result<Estimate> {
    let len = ctx.source().len();
    let mut prober = Prober::new(ctx);

    let (low, low_stride) = prober.lower_bound(0, len)?;
    let (high, high_stride) = prober.upper_bound(low, len)?;
    let last_stride = low_stride.max(high_stride);
    let margin = prober.margin(last_stride);

    let raw = SearchWindow { low, high };
    let window = SearchWindow {
        low: low.saturating_sub(margin),
        high: high.saturating_add(margin).min(len),
    };

    debug!(
        target_date = %ctx.target(),
        low,
        high,
        margin,
        probes = prober.probes,
        hits = prober.hits,
        "estimated search window"
    );

    Ok(Estimate {
        window,
        raw,
        probes: prober.probes,
        hits: prober.hits,
        last_stride,
    })
}

/// Dates of the first and last parseable lines, looking at most
/// `max_probe_skip` lines in from either end.
pub fn date_bounds(ctx: &RunContext) -> Result<DateBounds> {
    let locator = ctx.locator();
    let budget = ctx.options().max_probe_skip.max(1);
    let source = ctx.source();

    let mut first = None;
    let mut offset = 0;
    for _ in 0..budget {
        let Some(span) = locator.align_forward(offset)? else {
            break;
        };
        if let LineDate::Parsed(date) = read_date(source, span)? {
            first = Some(date);
            break;
        }
        offset = span.end;
    }

    let mut last = None;
    let mut cursor = match source.len() {
        0 => None,
        len => locator.line_containing(len - 1)?,
    };
    for _ in 0..budget {
        let Some(span) = cursor else {
            break;
        };
        if let LineDate::Parsed(date) = read_date(source, span)? {
            last = Some(date);
            break;
        }
        cursor = locator.previous_line(span.start)?;
    }

    Ok(DateBounds { first, last })
}
