use super::{scan_chunk, Aggregator, Chunk};
use crate::context::RunContext;
use crate::error::{ExtractError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use tracing::{debug, warn};

/// Fixed-size worker pool for chunk scans.
///
/// Workers only read from the shared source and send their results over a
/// channel; nothing is mutated concurrently. The first failing chunk cancels
/// the rest of the run.
pub struct ScanPool {
    pool: ThreadPool,
    workers: usize,
}

impl ScanPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("logslice-scan-{}", i))
            .build()
            .map_err(|e| ExtractError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Scan every chunk and hand the results to `aggregator`.
    ///
    /// A chunk that errors or panics is reported as
    /// [`ExtractError::WorkerFailure`]; when several fail, the one earliest
    /// in the file wins.
    pub fn scan_all(
        &self,
        ctx: &RunContext,
        chunks: &[Chunk],
        aggregator: &mut Aggregator,
    ) -> Result<()> {
        let (tx, rx) = mpsc::channel();

        self.pool.scope(|scope| {
            for chunk in chunks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| scan_chunk(ctx, chunk)))
                        .unwrap_or_else(|payload| {
                            Err(ExtractError::WorkerFailure {
                                chunk: chunk.id,
                                start: chunk.start,
                                end: chunk.end,
                                reason: panic_message(payload.as_ref()),
                            })
                        });
                    if outcome.is_err() {
                        ctx.cancel().cancel();
                    }
                    // Receiver outlives the scope
                    let _ = tx.send((*chunk, outcome));
                });
            }
        });
        drop(tx);

        let mut failure: Option<(Chunk, ExtractError)> = None;
        let mut cancelled = false;
        for (chunk, outcome) in rx {
            match outcome {
                Ok(matches) => {
                    debug!(
                        chunk = chunk.id,
                        lines = matches.lines_scanned,
                        matches = matches.lines.len(),
                        "chunk scanned"
                    );
                    aggregator.push(matches);
                }
                Err(ExtractError::Cancelled) => cancelled = true,
                Err(e) => {
                    warn!(chunk = chunk.id, error = %e, "chunk scan failed");
                    if failure.as_ref().map_or(true, |(first, _)| chunk.start < first.start) {
                        failure = Some((chunk, e));
                    }
                }
            }
        }

        match failure {
            Some((chunk, e)) => Err(e.in_chunk(&chunk)),
            None if cancelled => Err(ExtractError::Cancelled),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ByteRange, ByteSource};
    use crate::scan::partition;
    use crate::test_utils::{day_lines, naive_scan, small_options, FailingSource};
    use std::sync::Arc;

    fn chunks_for(ctx: &RunContext, workers: usize) -> Vec<Chunk> {
        let whole = ByteRange::new(0, ctx.source().len());
        partition(&ctx.locator(), &[whole], workers, None).unwrap()
    }

    #[test]
    fn test_scan_all_matches_sequential_scan() {
        let source = day_lines("2024-05-01", 20, 30);
        let expected = naive_scan(source.bytes(), "2024-05-07");
        let ctx = crate::test_utils::context(source, "2024-05-07", small_options());
        let chunks = chunks_for(&ctx, 6);
        assert!(chunks.len() > 1);

        let pool = ScanPool::new(3).unwrap();
        let mut aggregator = Aggregator::default();
        pool.scan_all(&ctx, &chunks, &mut aggregator).unwrap();

        assert_eq!(aggregator.fragment_count(), chunks.len());
        assert_eq!(aggregator.finish().lines, expected);
    }

    /// Chunks of `inner` plus a context whose scan of chunk `bad` breaks.
    fn failing_setup(panic: bool, bad: usize) -> (RunContext, Vec<Chunk>) {
        let inner = day_lines("2024-05-01", 10, 30);
        let plain = crate::test_utils::context(inner.clone(), "2024-05-03", small_options());
        let chunks = chunks_for(&plain, 4);

        // Inside the first scan window of the chunk; smaller reads pass
        let poison = chunks[bad].start + 10;
        let source = if panic {
            FailingSource::panicking(inner, poison, 200)
        } else {
            FailingSource::erroring(inner, poison, 200)
        };
        let ctx = RunContext::new(
            Arc::new(source),
            "2024-05-03".parse().unwrap(),
            small_options(),
        );
        (ctx, chunks)
    }

    #[test]
    fn test_failing_chunk_reported_as_worker_failure() {
        let (ctx, chunks) = failing_setup(false, 2);

        let pool = ScanPool::new(2).unwrap();
        let err = pool
            .scan_all(&ctx, &chunks, &mut Aggregator::default())
            .unwrap_err();
        match err {
            ExtractError::WorkerFailure { chunk, start, .. } => {
                assert_eq!(chunk, chunks[2].id);
                assert_eq!(start, chunks[2].start);
            }
            other => panic!("expected WorkerFailure, got {:?}", other),
        }
        assert!(ctx.cancel().is_cancelled());
    }

    #[test]
    fn test_panicking_chunk_is_contained() {
        let (ctx, chunks) = failing_setup(true, 1);

        let pool = ScanPool::new(4).unwrap();
        let err = pool
            .scan_all(&ctx, &chunks, &mut Aggregator::default())
            .unwrap_err();
        match err {
            ExtractError::WorkerFailure { chunk, reason, .. } => {
                assert_eq!(chunk, chunks[1].id);
                assert!(reason.contains("panicked"), "reason: {}", reason);
            }
            other => panic!("expected WorkerFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_no_chunks() {
        let ctx = crate::test_utils::context(
            crate::reader::MemorySource::new(Vec::<u8>::new()),
            "2024-01-01",
            small_options(),
        );
        let pool = ScanPool::new(2).unwrap();
        let mut aggregator = Aggregator::default();
        pool.scan_all(&ctx, &[], &mut aggregator).unwrap();
        assert_eq!(aggregator.match_count(), 0);
    }
}
