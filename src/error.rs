//! Error types for the extraction pipeline.
//!
//! Malformed lines never show up here: they are a normal [`LineDate`] value.
//! Of the variants below only [`ExtractError::EstimationFailure`] and
//! [`ExtractError::BoundaryUnstable`] are recovered from (by falling back to a
//! full scan); everything else aborts the run.
//!
//! [`LineDate`]: crate::timestamp::LineDate

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::scan::partition::Chunk;

/// Pipeline stage an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Estimate,
    Refine,
    Partition,
    Scan,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Open => "open",
            Stage::Estimate => "estimation",
            Stage::Refine => "boundary refinement",
            Stage::Partition => "partitioning",
            Stage::Scan => "chunk scan",
            Stage::Output => "output",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("log file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    AccessDenied { path: PathBuf },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to map bytes {start}..{end}")]
    MapFailure {
        start: u64,
        end: u64,
        #[source]
        source: io::Error,
    },

    #[error("no parseable timestamp within {skipped} lines of offset {offset}")]
    EstimationFailure { offset: u64, skipped: usize },

    #[error("hot region still growing after {rounds} widening rounds")]
    BoundaryUnstable { rounds: usize },

    #[error("chunk {chunk} (bytes {start}..{end}) failed: {reason}")]
    WorkerFailure {
        chunk: usize,
        start: u64,
        end: u64,
        reason: String,
    },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("failed to write matched lines")]
    Write(#[source] io::Error),

    #[error("run cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Errors that only cost speed: the caller can still get a complete
    /// result by scanning the whole file.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ExtractError::EstimationFailure { .. } | ExtractError::BoundaryUnstable { .. }
        )
    }

    /// Wrap an error raised while scanning `chunk` so the report names it.
    pub fn in_chunk(self, chunk: &Chunk) -> Self {
        match self {
            err @ (ExtractError::WorkerFailure { .. } | ExtractError::Cancelled) => err,
            other => ExtractError::WorkerFailure {
                chunk: chunk.id,
                start: chunk.start,
                end: chunk.end,
                reason: error_chain(&other),
            },
        }
    }
}

/// `err` and its sources joined by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// A fatal error tagged with the stage that produced it. The failing
/// [`ExtractError`] is its source, not part of its message.
#[derive(Debug, Error)]
#[error("{stage} stage failed")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: ExtractError,
}

impl RunError {
    pub fn new(stage: Stage, source: ExtractError) -> Self {
        Self { stage, source }
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
