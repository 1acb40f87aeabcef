use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use memmap2::{Mmap, MmapOptions};

/// A producer of sequential byte ranges.
///
/// `read_range` fills a prefix of `buf` and reports how much of it is valid:
/// - `Ok(Some(n))`: `n` bytes were read. `n == 0` is a no-op read, not the end.
/// - `Ok(None)`: end of stream. No further calls are made.
/// - `Err(_)`: the stream failed.
pub trait StreamSource {
    fn read_range(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

impl<S: StreamSource + ?Sized> StreamSource for &mut S {
    #[inline]
    fn read_range(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        (**self).read_range(buf)
    }
}

/// Adapts any [`Read`] into a [`StreamSource`].
///
/// `Read` has no separate end-of-stream signal, so a zero-length read into a
/// non-empty buffer is reported as the end. `Interrupted` is retried.
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> StreamSource for ReaderSource<R> {
    fn read_range(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        loop {
            match self.inner.read(buf) {
                Ok(0) if !buf.is_empty() => return Ok(None),
                Ok(n) => return Ok(Some(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Shared flag that closes a [`Cancellable`] source early.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Wraps a source so that cancelling its [`CancelHandle`] turns the next read
/// into end-of-stream. Chunks produced before the cancel are still counted.
pub struct Cancellable<S> {
    inner: S,
    handle: CancelHandle,
}

impl<S: StreamSource> Cancellable<S> {
    pub fn new(inner: S, handle: CancelHandle) -> Self {
        Self { inner, handle }
    }
}

impl<S: StreamSource> StreamSource for Cancellable<S> {
    fn read_range(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if self.handle.is_cancelled() {
            tracing::warn!("input cancelled, treating as end of stream");
            return Ok(None);
        }
        self.inner.read_range(buf)
    }
}

/// An opened file operand: mapped when it is a non-empty regular file,
/// otherwise left as a handle to stream from.
pub enum Input {
    Mapped(Mmap),
    Stream(File),
}

/// Track whether O_NOATIME is supported to avoid repeated failed open() attempts.
#[cfg(target_os = "linux")]
static NOATIME_SUPPORTED: AtomicBool = AtomicBool::new(true);

/// Open a file with O_NOATIME on Linux to avoid atime inode writes.
#[cfg(target_os = "linux")]
fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    if NOATIME_SUPPORTED.load(Ordering::Relaxed) {
        match std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path)
        {
            Ok(f) => return Ok(f),
            Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => {
                // O_NOATIME requires file ownership or CAP_FOWNER
                NOATIME_SUPPORTED.store(false, Ordering::Relaxed);
            }
            Err(e) => return Err(e),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Open a file operand for counting.
///
/// Regular non-empty files are mapped read-only so they can be split in place
/// without copying. Pipes, devices and empty files (which cannot be mapped)
/// come back as [`Input::Stream`], as does any file whose mapping fails.
pub fn open_input(path: &Path) -> io::Result<Input> {
    let file = open_noatime(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::new(io::ErrorKind::IsADirectory, "Is a directory"));
    }
    if !metadata.file_type().is_file() || metadata.len() == 0 {
        return Ok(Input::Stream(file));
    }

    // SAFETY: read-only mapping; a concurrent truncation by another process
    // is outside what any mmap-based reader can guard against.
    match unsafe { MmapOptions::new().map(&file) } {
        Ok(mmap) => {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
                let _ = mmap.advise(memmap2::Advice::WillNeed);
            }
            Ok(Input::Mapped(mmap))
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "mmap failed, streaming instead");
            Ok(Input::Stream(file))
        }
    }
}
