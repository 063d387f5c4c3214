//! End-to-end extraction: estimate, refine, partition, scan, merge.

use crate::context::{ExtractOptions, RunContext};
use crate::error::{ExtractError, RunError, Stage};
use crate::output::{write_lines, LineSink};
use crate::reader::{ByteRange, ByteSource, MmapSource};
use crate::scan::{partition, Aggregator, MatchedLine, ScanPool};
use crate::search::{date_bounds, estimate, refine, DateBounds, FallbackReason, Refinement};
use crate::timestamp::TargetDate;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How the target date was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Strategy {
    /// Estimated, verified hot region plus a scan of everything else
    HotRegion,
    /// Every byte scanned by the chunk workers
    FullScan { reason: FallbackReason },
}

/// Summary of a run, printed by the CLI and available as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub target: TargetDate,
    pub file_len: u64,
    pub strategy: Strategy,
    pub hot_region: Option<ByteRange>,
    pub first_match: Option<u64>,
    pub last_match: Option<u64>,
    pub probes: usize,
    pub widen_rounds: usize,
    pub chunks: usize,
    pub workers: usize,
    pub matches: usize,
    pub lines_scanned: u64,
    pub malformed: u64,
    pub file_dates: DateBounds,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct Extraction {
    /// Matching lines in file order, without terminators
    pub lines: Vec<MatchedLine>,
    pub report: RunReport,
}

impl Extraction {
    /// Stream every match to `sink` in file order. Flushing is left to the
    /// caller.
    pub fn write_to(&self, sink: &mut dyn LineSink) -> Result<(), RunError> {
        write_lines(&self.lines, sink)
            .map_err(|e| RunError::new(Stage::Output, ExtractError::Write(e)))
    }
}

/// Runs the pipeline over one source for one date.
pub struct Extractor {
    ctx: RunContext,
}

impl Extractor {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    /// Map the log file at `path` and prepare a run for `target`.
    pub fn open(path: &Path, target: TargetDate, options: ExtractOptions) -> Result<Self, RunError> {
        let source = MmapSource::open(path).map_err(|e| RunError::new(Stage::Open, e))?;
        info!(path = %path.display(), len = source.len(), "opened log file");
        Ok(Self::new(RunContext::new(Arc::new(source), target, options)))
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn run(&self) -> Result<Extraction, RunError> {
        let started = Instant::now();
        let ctx = &self.ctx;
        let len = ctx.source().len();
        let workers = ctx.options().workers.max(1);

        let file_dates = date_bounds(ctx).map_err(|e| RunError::new(Stage::Estimate, e))?;
        let (refinement, estimate_probes) = self.locate()?;
        let Refinement {
            hot,
            complement,
            fallback,
            widen_rounds,
            probes,
        } = refinement;

        let strategy = match fallback {
            Some(reason) => Strategy::FullScan { reason },
            None => Strategy::HotRegion,
        };
        let hot_region = hot.as_ref().map(|h| h.range);

        let chunks = partition(
            &ctx.locator(),
            &complement,
            workers,
            ctx.options().max_chunk_bytes,
        )
        .map_err(|e| RunError::new(Stage::Partition, e))?;
        info!(
            chunks = chunks.len(),
            bytes = complement.iter().map(ByteRange::len).sum::<u64>(),
            workers,
            "scanning outside the hot region"
        );

        let pool = ScanPool::new(workers).map_err(|e| RunError::new(Stage::Scan, e))?;
        let mut aggregator = Aggregator::new(hot.map(|h| h.matches));
        pool.scan_all(ctx, &chunks, &mut aggregator)
            .map_err(|e| RunError::new(Stage::Scan, e))?;

        let merged = aggregator.finish();
        let report = RunReport {
            target: ctx.target(),
            file_len: len,
            strategy,
            hot_region,
            first_match: merged.lines.first().map(|m| m.offset),
            last_match: merged.lines.last().map(|m| m.offset),
            probes: estimate_probes + probes,
            widen_rounds,
            chunks: chunks.len(),
            workers: pool.workers(),
            matches: merged.lines.len(),
            lines_scanned: merged.lines_scanned,
            malformed: merged.malformed,
            file_dates,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if report.malformed > 0 {
            debug!(malformed = report.malformed, "skipped lines without a date");
        }
        info!(matches = report.matches, elapsed_ms = report.elapsed_ms, "extraction finished");

        Ok(Extraction {
            lines: merged.lines,
            report,
        })
    }

    /// Estimate and refine the hot region, falling back to a full scan on
    /// recoverable trouble. Returns the refinement and the estimator's probe
    /// count.
    fn locate(&self) -> Result<(Refinement, usize), RunError> {
        let ctx = &self.ctx;
        let len = ctx.source().len();

        match estimate(ctx) {
            Ok(estimate) => {
                let refinement =
                    refine(ctx, &estimate).map_err(|e| RunError::new(Stage::Refine, e))?;
                Ok((refinement, estimate.probes))
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "estimation failed, scanning the whole file");
                Ok((Refinement::full_scan(len, FallbackReason::EstimationFailure), 0))
            }
            Err(e) => Err(RunError::new(Stage::Estimate, e)),
        }
    }
}

/// Extract every line of `target` from the log file at `path`.
pub fn extract_file(
    path: &Path,
    target: TargetDate,
    options: ExtractOptions,
) -> Result<Extraction, RunError> {
    Extractor::open(path, target, options)?.run()
}
