use crossbeam_channel::Sender;

use super::core::Chunk;
use super::error::WcError;
use crate::common::io::StreamSource;

/// Totals for the chunks a [`Chunker`] has produced so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub chunks: u64,
    pub bytes: u64,
}

/// Reads a stream source in order and turns each read into a [`Chunk`].
///
/// The boundary flags of every chunk are fixed here, in stream order, so the
/// consumers can score chunks in any order without talking to each other.
pub struct Chunker<S> {
    source: S,
    buf: Vec<u8>,
    is_first: bool,
    prev_ends_with_word: bool,
    stats: ChunkStats,
}

impl<S: StreamSource> Chunker<S> {
    /// `chunk_size` bounds each read; a zero size is bumped to one byte.
    pub fn new(source: S, chunk_size: usize) -> Self {
        Self {
            source,
            buf: vec![0u8; chunk_size.max(1)],
            is_first: true,
            prev_ends_with_word: false,
            stats: ChunkStats::default(),
        }
    }

    pub fn stats(&self) -> ChunkStats {
        self.stats
    }

    /// Read the next non-empty range and wrap it as a chunk.
    /// Returns `Ok(None)` once the source reports end-of-stream.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, WcError> {
        loop {
            let n = match self.source.read_range(&mut self.buf)? {
                None => return Ok(None),
                Some(0) => continue,
                Some(n) => n,
            };

            // copy out: the read buffer is reused for the next range
            let chunk = Chunk::new(
                self.buf[..n].to_vec(),
                self.is_first,
                self.prev_ends_with_word,
            );
            self.is_first = false;
            self.prev_ends_with_word = chunk.ends_with_word;
            self.stats.chunks += 1;
            self.stats.bytes += n as u64;
            return Ok(Some(chunk));
        }
    }

    /// Push every chunk onto `queue` until the source is exhausted.
    ///
    /// `queue` is dropped on return, which closes it for the consumers on
    /// both the normal and the error path.
    pub fn run(mut self, queue: Sender<Chunk>) -> Result<ChunkStats, WcError> {
        while let Some(chunk) = self.next_chunk()? {
            queue.send(chunk).map_err(|_| WcError::QueueClosed)?;
        }
        Ok(self.stats)
    }
}
