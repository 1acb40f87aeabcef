mod chunker;
mod config;
mod core;
mod error;
mod pool;


pub use self::chunker::{ChunkStats, Chunker};
pub use self::config::{CountConfig, default_workers};
pub use self::core::*;
pub use self::error::WcError;
pub use self::pool::{Aggregate, count_stream, count_stream_serial};
