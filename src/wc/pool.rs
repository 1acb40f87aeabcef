//! Fixed pool of scoped worker threads fed by a bounded chunk queue.
//!
//! The calling thread runs the [`Chunker`] as the single producer. Workers
//! pull chunks, score them with [`Chunk::contribution`], and add the result to
//! the run's [`Aggregate`]. Leaving the thread scope joins every worker, which
//! is the only synchronisation needed before the total is read.

use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use tracing::{debug, error, trace};

use super::chunker::Chunker;
use super::config::CountConfig;
use super::core::{Chunk, chunk_words, ends_with_word};
use super::error::WcError;
use crate::common::io::StreamSource;

/// Running total shared by the workers of one run.
///
/// Contributions are signed and only ever added, so a relaxed atomic add is
/// enough; the final read happens after the workers are joined.
#[derive(Debug, Default)]
pub struct Aggregate {
    total: AtomicI64,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&self, contribution: i64) {
        self.total.fetch_add(contribution, Ordering::Relaxed);
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Final word count. Only meaningful once every contribution is in.
    pub fn into_count(self) -> u64 {
        let total = self.total.into_inner();
        debug_assert!(total >= 0, "negative word total {}", total);
        total.max(0) as u64
    }
}

fn worker(id: usize, queue: Receiver<Chunk>, aggregate: &Aggregate) -> u64 {
    trace!(worker = id, "worker started");
    let mut processed = 0u64;
    for chunk in queue.iter() {
        aggregate.add(chunk.contribution());
        processed += 1;
    }
    trace!(worker = id, chunks = processed, "worker finished");
    processed
}

/// Count the words in `source` with `config.workers` parallel workers.
///
/// Reads stop at the first error; the queued chunks are drained, the workers
/// joined, and the error returned without a count.
pub fn count_stream<S: StreamSource>(source: S, config: &CountConfig) -> Result<u64, WcError> {
    config.validate()?;
    debug!(
        workers = config.workers,
        chunk_size = config.chunk_size,
        queue_depth = config.queue_depth,
        "starting parallel word count"
    );

    let aggregate = Aggregate::new();
    let (tx, rx) = crossbeam_channel::bounded::<Chunk>(config.queue_depth);
    let chunker = Chunker::new(source, config.chunk_size);

    let (produced, per_worker) = thread::scope(|s| {
        let handles: Vec<_> = (0..config.workers)
            .map(|id| {
                let rx = rx.clone();
                let aggregate = &aggregate;
                s.spawn(move || worker(id, rx, aggregate))
            })
            .collect();
        // workers hold the only receivers; if they all exit, send fails
        drop(rx);

        let produced = chunker.run(tx);

        let per_worker: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect();
        (produced, per_worker)
    });

    let stats = match produced {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "aborting word count");
            return Err(e);
        }
    };

    let words = aggregate.into_count();
    debug!(
        chunks = stats.chunks,
        bytes = stats.bytes,
        words,
        ?per_worker,
        "parallel word count finished"
    );
    Ok(words)
}

/// Count the words in `source` on the calling thread.
///
/// Reads into one reusable buffer and carries the boundary flags across reads
/// exactly as the chunker does, so it agrees with [`count_stream`] for every
/// input. Useful as a reference and for inputs too small to be worth threads.
pub fn count_stream_serial<S: StreamSource>(
    mut source: S,
    chunk_size: usize,
) -> Result<u64, WcError> {
    if chunk_size == 0 {
        return Err(WcError::InvalidConfig("chunk size must be at least 1 byte"));
    }
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0i64;
    let mut is_first = true;
    let mut prev_ends_with_word = false;

    while let Some(n) = source.read_range(&mut buf)? {
        if n == 0 {
            continue;
        }
        let data = &buf[..n];
        total += chunk_words(data, is_first, prev_ends_with_word);
        is_first = false;
        prev_ends_with_word = ends_with_word(data);
    }

    debug_assert!(total >= 0);
    Ok(total as u64)
}
