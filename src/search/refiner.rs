//! Boundary refinement: turn the estimated window into the exact hot region.
//!
//! The widened window is scanned line by line. If the first or last dated
//! line in it already belongs to the target date, the estimate cut the date
//! short, so the search is re-run from that edge and only the new bytes are
//! scanned. A date going backwards inside the scanned bytes means the file is
//! not ordered; the run then falls back to scanning everything.

use super::estimator::{Estimate, Prober};
use crate::context::RunContext;
use crate::error::Result;
use crate::reader::{for_each_line, ByteRange};
use crate::scan::{ChunkMatches, MatchedLine};
use crate::timestamp::{parse_line_date, LineDate};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Why the run stopped trusting the estimate and scans the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// Too many consecutive malformed lines around a probe
    EstimationFailure,
    /// The hot region kept growing
    BoundaryUnstable,
    /// Dates went backwards inside the scanned window
    OrderViolation,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::EstimationFailure => "too many malformed lines to estimate",
            FallbackReason::BoundaryUnstable => "hot region did not stabilise",
            FallbackReason::OrderViolation => "timestamps are not in order",
        };
        f.write_str(text)
    }
}

/// Verified byte range of the target date plus the matches found in it.
#[derive(Debug, Clone)]
pub struct HotRegion {
    pub range: ByteRange,
    pub matches: ChunkMatches,
    pub first_match: Option<u64>,
    pub last_match: Option<u64>,
}

#[derive(Debug)]
pub struct Refinement {
    /// `None` when falling back to a full scan
    pub hot: Option<HotRegion>,
    /// Ranges left for the chunk scanners, in file order
    pub complement: Vec<ByteRange>,
    pub fallback: Option<FallbackReason>,
    pub widen_rounds: usize,
    pub probes: usize,
}

impl Refinement {
    /// Give up on the hot region: every byte goes to the chunk scanners.
    pub fn full_scan(len: u64, reason: FallbackReason) -> Self {
        Self {
            hot: None,
            complement: whole(len),
            fallback: Some(reason),
            widen_rounds: 0,
            probes: 0,
        }
    }
}

fn whole(len: u64) -> Vec<ByteRange> {
    if len == 0 {
        Vec::new()
    } else {
        vec![ByteRange::new(0, len)]
    }
}

/// Everything outside `hot`, as at most two non-empty ranges.
fn complement_of(hot: ByteRange, len: u64) -> Vec<ByteRange> {
    if hot.is_empty() {
        return whole(len);
    }
    [ByteRange::new(0, hot.start), ByteRange::new(hot.end, len)]
        .into_iter()
        .filter(|range| !range.is_empty())
        .collect()
}

/// Result of scanning a stretch of the window.
#[derive(Debug, Default)]
struct WindowScan {
    matches: Vec<MatchedLine>,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
    ordered: bool,
    lines: u64,
    malformed: u64,
}

impl WindowScan {
    fn prepend(&mut self, mut front: WindowScan) {
        self.ordered &= front.ordered && in_order(front.last, self.first);
        front.matches.append(&mut self.matches);
        self.matches = front.matches;
        self.first = front.first.or(self.first);
        self.last = self.last.or(front.last);
        self.lines += front.lines;
        self.malformed += front.malformed;
    }

    fn append(&mut self, mut back: WindowScan) {
        self.ordered &= back.ordered && in_order(self.last, back.first);
        self.matches.append(&mut back.matches);
        self.first = self.first.or(back.first);
        self.last = back.last.or(self.last);
        self.lines += back.lines;
        self.malformed += back.malformed;
    }
}

fn in_order(before: Option<NaiveDate>, after: Option<NaiveDate>) -> bool {
    match (before, after) {
        (Some(a), Some(b)) => a <= b,
        _ => true,
    }
}

fn scan_window(ctx: &RunContext, range: ByteRange) -> Result<WindowScan> {
    let target = ctx.target().date();
    let mut scan = WindowScan {
        ordered: true,
        ..WindowScan::default()
    };

    for_each_line(ctx.source(), range, ctx.options().scan_window, |offset, line| {
        scan.lines += 1;
        match parse_line_date(line) {
            LineDate::Parsed(date) => {
                if scan.last.is_some_and(|prev| date < prev) {
                    scan.ordered = false;
                }
                scan.first.get_or_insert(date);
                scan.last = Some(date);
                if date == target {
                    scan.matches.push(MatchedLine::new(offset, line));
                }
            }
            LineDate::Malformed => scan.malformed += 1,
        }
        ControlFlow::Continue(())
    })?;

    Ok(scan)
}

/// Scan the estimated window and settle the hot region.
///
/// Recoverable trouble (malformed stretches, unordered dates, a region that
/// keeps growing) produces a full-scan [`Refinement`]; only I/O and mapping
/// errors are returned as `Err`.
pub fn refine(ctx: &RunContext, estimate: &Estimate) -> Result<Refinement> {
    let len = ctx.source().len();
    let locator = ctx.locator();
    let target = Some(ctx.target().date());

    let start = locator.snap_forward(estimate.window.low)?;
    let end = locator.snap_forward(estimate.window.high)?.max(start);
    let mut region = ByteRange::new(start, end);
    let mut scan = scan_window(ctx, region)?;

    let mut prober = Prober::new(ctx);
    let mut rounds = 0;

    let fallback = |reason: FallbackReason, rounds: usize, probes: usize| {
        warn!(%reason, rounds, "falling back to a full scan");
        Refinement {
            widen_rounds: rounds,
            probes,
            ..Refinement::full_scan(len, reason)
        }
    };

    loop {
        if !scan.ordered {
            return Ok(fallback(FallbackReason::OrderViolation, rounds, prober.probes));
        }

        let grow_left = region.start > 0 && scan.first == target;
        let grow_right = region.end < len && scan.last == target;
        if !grow_left && !grow_right {
            break;
        }
        if rounds >= ctx.options().max_widen_rounds {
            return Ok(fallback(FallbackReason::BoundaryUnstable, rounds, prober.probes));
        }
        rounds += 1;

        if grow_left {
            let new_start = match widen_left(ctx, &mut prober, region.start) {
                Ok(offset) => offset,
                Err(e) if e.is_recoverable() => {
                    return Ok(fallback(FallbackReason::EstimationFailure, rounds, prober.probes))
                }
                Err(e) => return Err(e),
            };
            debug!(from = region.start, to = new_start, "widening hot region left");
            scan.prepend(scan_window(ctx, ByteRange::new(new_start, region.start))?);
            region.start = new_start;
        }

        if grow_right {
            let new_end = match widen_right(ctx, &mut prober, region.end) {
                Ok(offset) => offset,
                Err(e) if e.is_recoverable() => {
                    return Ok(fallback(FallbackReason::EstimationFailure, rounds, prober.probes))
                }
                Err(e) => return Err(e),
            };
            debug!(from = region.end, to = new_end, "widening hot region right");
            scan.append(scan_window(ctx, ByteRange::new(region.end, new_end))?);
            region.end = new_end;
        }
    }

    let first_match = scan.matches.first().map(|m| m.offset);
    let last_match = scan.matches.last().map(|m| m.offset);
    debug!(
        start = region.start,
        end = region.end,
        matches = scan.matches.len(),
        rounds,
        "hot region settled"
    );

    Ok(Refinement {
        hot: Some(HotRegion {
            range: region,
            matches: ChunkMatches {
                start: region.start,
                lines: scan.matches,
                lines_scanned: scan.lines,
                malformed: scan.malformed,
            },
            first_match,
            last_match,
        }),
        complement: complement_of(region, len),
        fallback: None,
        widen_rounds: rounds,
        probes: prober.probes,
    })
}

/// New start for a region whose first dated line matched. Always moves at
/// least one line left of `edge`.
fn widen_left(ctx: &RunContext, prober: &mut Prober<'_>, edge: u64) -> Result<u64> {
    let locator = ctx.locator();
    let (low, stride) = prober.lower_bound(0, edge)?;
    let step = ctx.options().min_search_window.max(1);
    let candidate = low
        .saturating_sub(prober.margin(stride))
        .min(edge.saturating_sub(step));

    let start = locator.snap_forward(candidate)?;
    if start < edge {
        return Ok(start);
    }
    // A single line covers the whole step
    Ok(locator.previous_line(edge)?.map_or(0, |span| span.start))
}

/// New end for a region whose last dated line matched. Always moves at least
/// one line right of `edge`.
fn widen_right(ctx: &RunContext, prober: &mut Prober<'_>, edge: u64) -> Result<u64> {
    let len = ctx.source().len();
    let (high, stride) = prober.upper_bound(edge, len)?;
    let step = ctx.options().min_search_window.max(1);
    let candidate = high
        .saturating_add(prober.margin(stride))
        .max(edge.saturating_add(step))
        .min(len);

    ctx.locator().snap_forward(candidate)
}
