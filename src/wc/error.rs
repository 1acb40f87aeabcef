use std::io;

use thiserror::Error;

use crate::common::io_error_msg;

/// Messages carry their cause inline; no variant reports a `source()`.
#[derive(Debug, Error)]
pub enum WcError {
    /// The stream source failed with something other than end-of-stream.
    #[error("{}", io_error_msg(.0))]
    Read(io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Every worker went away while the chunker still had input.
    #[error("work queue closed before the input was exhausted")]
    QueueClosed,

    #[error("cannot start worker threads: {0}")]
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl From<io::Error> for WcError {
    fn from(e: io::Error) -> Self {
        WcError::Read(e)
    }
}
