/// Use mimalloc as the global allocator.
/// Every chunk is a fresh allocation handed across threads, so the
/// thread-local caching matters more here than in most tools.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod wc;
