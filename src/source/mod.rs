//! Random-read sources and the shared read-buffer pool.
//!
//! [`ReadSource`] is the sole coupling between the reader core and any
//! storage backend: *read exactly N bytes at absolute offset O, or fail
//! with end-of-input*.  A short read is always an error.  Nothing above
//! this layer caches raw archive bytes.
//!
//! Two backends ship here: [`FileSource`] for local files (positional
//! reads serialized under a mutex) and [`MemorySource`] for in-memory
//! blobs.  Remote range-GET backends implement the same trait out of tree.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

// ── ReadSource ───────────────────────────────────────────────────────────────

pub trait ReadSource: Send + Sync {
    /// Total length of the underlying source in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes at `offset..offset + buf.len()`.
    ///
    /// Must fail with `UnexpectedEof` when the range runs past the end of
    /// the source; partial fills are never returned.
    fn read_into(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Allocating convenience wrapper around [`ReadSource::read_into`].
    fn read_exact_at(&self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        self.read_into(offset, &mut buf)?;
        Ok(buf)
    }
}

// ── FileSource ───────────────────────────────────────────────────────────────

/// Local-file backend.  Concurrent reads are serialized: the seek and the
/// read happen under one lock so interleaved callers cannot tear positions.
pub struct FileSource {
    file: Mutex<File>,
    len:  u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file: Mutex::new(file), len })
    }
}

impl ReadSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.file.lock().expect("file source lock poisoned");
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

// ── MemorySource ─────────────────────────────────────────────────────────────

/// In-memory blob backend.
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl ReadSource for MemorySource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset beyond source"))?;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.bytes.len()).ok_or_else(
            || io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of source"),
        )?;
        buf.copy_from_slice(&self.bytes[start..end]);
        Ok(())
    }
}

// ── Byte pool ────────────────────────────────────────────────────────────────

/// Smallest pooled buffer: 1 KiB.
const MIN_BUCKET_BYTES: usize = 1024;
/// Largest pooled buffer: 256 KiB.  Larger requests bypass the pool.
const MAX_BUCKET_BYTES: usize = 256 * 1024;
/// Bucket sizes are powers of two: 1 KiB, 2 KiB, …, 256 KiB.
const BUCKET_COUNT: usize = 9;
/// Retained buffers per bucket.
const MAX_PER_BUCKET: usize = 10;

/// Process-wide pool of size-bucketed reusable read buffers.
///
/// Strictly a throughput optimization for the extraction hot path; archives
/// opened with `use_byte_pool: false` never touch it.  Observable behavior
/// is identical either way.
pub struct BytePool {
    buckets: Mutex<Vec<Vec<Vec<u8>>>>,
}

impl BytePool {
    fn new() -> Self {
        Self { buckets: Mutex::new(vec![Vec::new(); BUCKET_COUNT]) }
    }

    pub fn global() -> &'static BytePool {
        static POOL: OnceLock<BytePool> = OnceLock::new();
        POOL.get_or_init(BytePool::new)
    }

    fn bucket_for(len: usize) -> Option<usize> {
        if len > MAX_BUCKET_BYTES {
            return None;
        }
        let size = len.max(MIN_BUCKET_BYTES).next_power_of_two();
        Some(size.trailing_zeros() as usize - MIN_BUCKET_BYTES.trailing_zeros() as usize)
    }

    /// Hand out a zero-filled buffer of exactly `len` bytes, reusing a
    /// pooled allocation when one fits.
    pub fn acquire(&self, len: usize) -> PoolBuf {
        let pooled = Self::bucket_for(len).and_then(|b| {
            let mut buckets = self.buckets.lock().expect("byte pool lock poisoned");
            buckets[b].pop()
        });
        match pooled {
            Some(mut buf) => {
                buf.clear();
                buf.resize(len, 0);
                PoolBuf { buf, pooled: true }
            }
            None => PoolBuf { buf: vec![0u8; len], pooled: false },
        }
    }

    fn release(&self, buf: Vec<u8>) {
        if let Some(b) = Self::bucket_for(buf.capacity()) {
            let mut buckets = self.buckets.lock().expect("byte pool lock poisoned");
            if buckets[b].len() < MAX_PER_BUCKET {
                buckets[b].push(buf);
            }
        }
    }
}

/// A buffer checked out of the [`BytePool`], returned on drop.
pub struct PoolBuf {
    buf:    Vec<u8>,
    pooled: bool,
}

impl PoolBuf {
    /// Plain allocation, never returned to the pool.
    pub fn unpooled(len: usize) -> Self {
        Self { buf: vec![0u8; len], pooled: false }
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.pooled = false;
        std::mem::take(&mut self.buf)
    }
}

impl Deref for PoolBuf {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PoolBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PoolBuf {
    fn drop(&mut self) {
        if self.pooled {
            BytePool::global().release(std::mem::take(&mut self.buf));
        }
    }
}
