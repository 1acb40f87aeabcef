use super::core::MIN_CHUNK_SIZE;
use super::error::WcError;

/// Worker count used when the platform cannot report its parallelism.
const FALLBACK_WORKERS: usize = 4;

/// Number of workers to run by default: one per available hardware thread.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

/// Tuning for one counting run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountConfig {
    /// Concurrent workers pulling chunks off the queue.
    pub workers: usize,
    /// Upper bound on the bytes in one chunk (one read of the source).
    pub chunk_size: usize,
    /// Chunks that may sit in the queue before the chunker blocks.
    pub queue_depth: usize,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self::with_workers(default_workers())
    }
}

impl CountConfig {
    /// Derive chunk size and queue depth from a worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            chunk_size: MIN_CHUNK_SIZE.saturating_mul(workers).max(MIN_CHUNK_SIZE),
            queue_depth: workers.max(1),
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn validate(&self) -> Result<(), WcError> {
        if self.workers == 0 {
            return Err(WcError::InvalidConfig("worker count must be at least 1"));
        }
        if self.chunk_size == 0 {
            return Err(WcError::InvalidConfig("chunk size must be at least 1 byte"));
        }
        if self.queue_depth == 0 {
            return Err(WcError::InvalidConfig("queue depth must be at least 1"));
        }
        Ok(())
    }
}
