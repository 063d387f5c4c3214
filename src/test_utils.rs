use crate::context::{ExtractOptions, RunContext};
use crate::error::{ExtractError, Result};
use crate::reader::{line_content, ByteSource, MappedRange, MemorySource};
use crate::scan::MatchedLine;
use crate::timestamp::{parse_line_date, LineDate, TargetDate};
use chrono::{Days, NaiveDate};
use std::io;
use std::sync::Arc;

/// Context over an in-memory source.
pub fn context(source: MemorySource, target: &str, options: ExtractOptions) -> RunContext {
    let target: TargetDate = target.parse().expect("valid target date");
    RunContext::new(Arc::new(source), target, options)
}

/// Options scaled down so that small fixtures still exercise windowing,
/// widening and multi-chunk scans.
pub fn small_options() -> ExtractOptions {
    ExtractOptions {
        workers: 4,
        scan_window: 256,
        locate_window: 16,
        min_search_window: 64,
        margin_factor: 2,
        max_probe_skip: 16,
        max_probes: 512,
        max_widen_rounds: 8,
        max_chunk_bytes: None,
    }
}

/// Log line in the usual shape: `2024-03-01T00:00:00.0000 - INFO - event 0`.
pub fn log_line(date: NaiveDate, second_of_day: u32, n: usize) -> String {
    format!(
        "{}T{:02}:{:02}:{:02}.0000 - INFO - event {}",
        date.format("%Y-%m-%d"),
        second_of_day / 3600,
        second_of_day / 60 % 60,
        second_of_day % 60,
        n
    )
}

/// `days` consecutive days starting at `start`, `per_day` lines each, spread
/// evenly over the day.
pub fn day_lines(start: &str, days: usize, per_day: usize) -> MemorySource {
    let first: NaiveDate = start.parse().expect("valid start date");
    let per_day_u32 = per_day.max(1) as u32;
    let mut lines = Vec::with_capacity(days * per_day);
    for day in 0..days {
        let date = first + Days::new(day as u64);
        for i in 0..per_day {
            let second = i as u32 * (86_400 / per_day_u32);
            lines.push(log_line(date, second, lines.len()));
        }
    }
    MemorySource::from_lines(&lines)
}

/// Reference answer: every line whose date prefix is `date`, in file order.
pub fn naive_scan(bytes: &[u8], date: &str) -> Vec<MatchedLine> {
    let target: NaiveDate = date.parse().expect("valid date");
    let mut matches = Vec::new();
    let mut offset = 0u64;
    for raw in bytes.split_inclusive(|&b| b == b'\n') {
        let line = line_content(raw);
        if parse_line_date(line) == LineDate::Parsed(target) {
            matches.push(MatchedLine::new(offset, line));
        }
        offset += raw.len() as u64;
    }
    matches
}

/// Wraps a [`MemorySource`] and breaks on large reads covering `poison`.
///
/// Probes and line lookups read little at a time and pass; the sequential
/// scans map whole windows and hit the failure.
pub struct FailingSource {
    inner: MemorySource,
    poison: u64,
    min_len: u64,
    panic: bool,
}

impl FailingSource {
    /// Fail with a mapping error.
    pub fn erroring(inner: MemorySource, poison: u64, min_len: u64) -> Self {
        Self {
            inner,
            poison,
            min_len,
            panic: false,
        }
    }

    /// Panic instead of returning an error.
    pub fn panicking(inner: MemorySource, poison: u64, min_len: u64) -> Self {
        Self {
            panic: true,
            ..Self::erroring(inner, poison, min_len)
        }
    }
}

impl ByteSource for FailingSource {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn map_range(&self, start: u64, end: u64) -> Result<MappedRange> {
        let hit = start <= self.poison && self.poison < end && end - start >= self.min_len;
        if hit {
            if self.panic {
                panic!("simulated worker crash at {}", self.poison);
            }
            return Err(ExtractError::MapFailure {
                start,
                end,
                source: io::Error::other("simulated read failure"),
            });
        }
        self.inner.map_range(start, end)
    }
}
