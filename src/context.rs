use crate::reader::locate::DEFAULT_LOCATE_WINDOW;
use crate::reader::walk::DEFAULT_SCAN_WINDOW;
use crate::reader::{ByteSource, LineLocator};
use crate::scan::cancel::CancelToken;
use crate::timestamp::TargetDate;
use std::sync::Arc;

/// Search stops narrowing once the window is this small (64 KiB)
pub const DEFAULT_MIN_SEARCH_WINDOW: u64 = 64 * 1024;

/// Widening applied to the estimate, in multiples of the last probe stride
pub const DEFAULT_MARGIN_FACTOR: u64 = 2;

/// Consecutive malformed lines a probe may step over
pub const DEFAULT_MAX_PROBE_SKIP: usize = 256;

pub const DEFAULT_MAX_PROBES: usize = 512;

pub const DEFAULT_MAX_WIDEN_ROUNDS: usize = 8;

/// Tuning knobs for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Scan workers (and chunk count target)
    pub workers: usize,
    /// Bytes mapped at a time by sequential scans
    pub scan_window: usize,
    /// Initial window for line-terminator searches
    pub locate_window: usize,
    /// Binary search stops below this width
    pub min_search_window: u64,
    pub margin_factor: u64,
    pub max_probe_skip: usize,
    pub max_probes: usize,
    pub max_widen_rounds: usize,
    /// Upper bound on a single chunk's size, if any
    pub max_chunk_bytes: Option<u64>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            scan_window: DEFAULT_SCAN_WINDOW,
            locate_window: DEFAULT_LOCATE_WINDOW,
            min_search_window: DEFAULT_MIN_SEARCH_WINDOW,
            margin_factor: DEFAULT_MARGIN_FACTOR,
            max_probe_skip: DEFAULT_MAX_PROBE_SKIP,
            max_probes: DEFAULT_MAX_PROBES,
            max_widen_rounds: DEFAULT_MAX_WIDEN_ROUNDS,
            max_chunk_bytes: None,
        }
    }
}

/// Logical CPU count, falling back to a single worker.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Everything a run needs, handed explicitly to every stage.
///
/// The source is shared read-only by the estimator, the refiner and all scan
/// workers; it is released when the last clone of the context's `Arc` goes.
pub struct RunContext {
    source: Arc<dyn ByteSource>,
    target: TargetDate,
    options: ExtractOptions,
    cancel: CancelToken,
}

impl RunContext {
    pub fn new(source: Arc<dyn ByteSource>, target: TargetDate, options: ExtractOptions) -> Self {
        Self {
            source,
            target,
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn source(&self) -> &dyn ByteSource {
        self.source.as_ref()
    }

    pub fn target(&self) -> TargetDate {
        self.target
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn locator(&self) -> LineLocator<'_> {
        LineLocator::new(self.source(), self.options.locate_window)
    }
}
