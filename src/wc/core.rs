use rayon::prelude::*;
use tracing::debug;

use super::config::CountConfig;
use super::error::WcError;

/// Smallest read the streaming counter issues, and the per-worker unit of
/// the default chunk size.
pub const MIN_CHUNK_SIZE: usize = 4096;

/// Whitespace lookup table for branchless word boundary detection.
/// C locale `isspace()`: space, tab, newline, CR, form feed, vertical tab.
const fn make_ws_table() -> [u8; 256] {
    let mut t = [0u8; 256];
    t[0x09] = 1; // \t  horizontal tab
    t[0x0A] = 1; // \n  newline
    t[0x0B] = 1; // \v  vertical tab
    t[0x0C] = 1; // \f  form feed
    t[0x0D] = 1; // \r  carriage return
    t[0x20] = 1; //     space
    t
}

/// Precomputed whitespace lookup: `WS_TABLE[byte] == 1` if whitespace, `0` otherwise.
const WS_TABLE: [u8; 256] = make_ws_table();

/// True for the six ASCII whitespace bytes. Everything else is word content,
/// including NUL, control characters and bytes >= 0x80.
#[inline]
pub fn is_space(b: u8) -> bool {
    WS_TABLE[b as usize] == 1
}

/// True iff `data` is non-empty and its last byte is word content.
#[inline]
pub fn ends_with_word(data: &[u8]) -> bool {
    data.last().is_some_and(|&b| !is_space(b))
}

/// True iff `data` is non-empty and its first byte is word content.
#[inline]
pub fn starts_with_word(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| !is_space(b))
}

/// Count words in one contiguous buffer.
/// A word is a maximal run of non-whitespace bytes.
///
/// Uses a branchless state machine: a word starts at each transition
/// from whitespace to non-whitespace.
pub fn count_words(data: &[u8]) -> u64 {
    let mut words = 0u64;
    let mut prev_ws = 1u8; // treat start-of-data as whitespace

    for &b in data {
        let curr_ws = WS_TABLE[b as usize];
        // 1 only at word-start transitions
        words += (prev_ws & (curr_ws ^ 1)) as u64;
        prev_ws = curr_ws;
    }
    words
}

/// One unit of parallel work: an owned slice of the stream plus the boundary
/// facts that were only knowable while reading it in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    /// Set only on the first chunk of a stream.
    pub is_first: bool,
    /// Last byte of `data` is word content.
    pub ends_with_word: bool,
    /// `ends_with_word` of the chunk just before this one in stream order.
    pub prev_ends_with_word: bool,
}

impl Chunk {
    /// Build a chunk, deriving `ends_with_word` from `data`.
    pub fn new(data: Vec<u8>, is_first: bool, prev_ends_with_word: bool) -> Self {
        let ends_with_word = ends_with_word(&data);
        Self {
            data,
            is_first,
            ends_with_word,
            prev_ends_with_word,
        }
    }

    /// This chunk's signed share of the stream's total word count.
    #[inline]
    pub fn contribution(&self) -> i64 {
        chunk_words(&self.data, self.is_first, self.prev_ends_with_word)
    }
}

/// Signed word count for one chunk of a larger stream.
///
/// Every maximal run of word bytes that ends inside `data`, or runs into its
/// last byte, counts once. When the previous chunk ended on a word byte and
/// `data` starts on one, that run was already counted by the previous chunk,
/// so one is subtracted. If `data` starts on whitespace no subtraction is
/// made, whatever the previous chunk ended with.
///
/// The correction only fires on a chunk that opens on a word byte, and such a
/// chunk always counts at least that word, so the result is never negative.
/// Summed over all chunks of a stream it gives the stream's word count
/// regardless of where the cuts fall.
pub fn chunk_words(data: &[u8], is_first: bool, prev_ends_with_word: bool) -> i64 {
    let mut count = 0i64;
    let mut in_word = 0u8;

    for &b in data {
        let ws = WS_TABLE[b as usize];
        // 1 only at word-end transitions
        count += (in_word & ws) as i64;
        in_word = ws ^ 1;
    }
    // trailing word, possibly continued by the next chunk
    count += in_word as i64;

    if !is_first && prev_ends_with_word && starts_with_word(data) {
        count -= 1;
    }
    count
}

/// Thread pool for slice counting, sized to the configured worker count
/// rather than rayon's all-cores global pool.
pub(crate) fn slice_pool(workers: usize) -> Result<rayon::ThreadPool, WcError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pwc-slice-{}", i))
        .build()
        .map_err(WcError::ThreadPool)
}

/// Count words in an in-memory buffer by scoring `config.chunk_size` pieces
/// in parallel on `config.workers` threads.
///
/// Each piece's neighbour is right there in `data`, so its boundary flags come
/// straight from the byte before it instead of a sequential pass.
pub fn count_words_parallel(data: &[u8], config: &CountConfig) -> Result<u64, WcError> {
    config.validate()?;
    let chunk_size = config.chunk_size;
    if data.len() <= chunk_size {
        return Ok(count_words(data));
    }

    let pool = slice_pool(config.workers)?;
    debug!(
        workers = pool.current_num_threads(),
        chunk_size,
        bytes = data.len(),
        "counting mapped input"
    );
    let total: i64 = pool.install(|| {
        data.par_chunks(chunk_size)
            .enumerate()
            .map(|(i, piece)| {
                let prev_ends_with_word = i > 0 && !is_space(data[i * chunk_size - 1]);
                chunk_words(piece, i == 0, prev_ends_with_word)
            })
            .sum()
    });

    debug_assert!(total >= 0);
    Ok(total as u64)
}
