//! Append-only scratch store backing spilled records.

use crate::error::Error;
use memmap2::{Mmap, MmapOptions};
use parking_lot::Mutex;
use std::{
    fs::{self, File, OpenOptions},
    io::{Seek, SeekFrom, Write as _},
    path::{Path, PathBuf},
};

/// Default capacity of the in-memory write buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100 * 1024 * 1024;

/// Alignment of mapped view offsets. A multiple of the Windows allocation
/// granularity, which every POSIX page size also divides.
const MAP_GRANULARITY: u64 = 64 * 1024;

/// A read-only view over a chunk of the dump store.
///
/// The view is mapped at an offset aligned down to the map granularity;
/// `as_slice` exposes only the requested chunk. Dropping the chunk unmaps
/// the view.
pub struct MappedChunk {
    map: Mmap,
    /// Offset of the requested data within the mapped view.
    start: usize,
    /// Requested chunk size.
    len: usize,
    /// Aligned file offset the view was mapped at.
    map_offset: u64,
}

impl MappedChunk {
    /// The requested bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.map[self.start..self.start + self.len]
    }

    /// Requested chunk length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The aligned offset the underlying view was mapped at.
    pub fn map_offset(&self) -> u64 {
        self.map_offset
    }
}

struct Inner {
    file: File,
    /// Durable logical size. Excludes the buffered tail.
    len: u64,
    /// Write buffer; its length is the cursor.
    buffer: Vec<u8>,
    capacity: usize,
}

impl Inner {
    /// Flush the buffered tail to disk, advancing the durable size.
    fn flush(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::Start(self.len))
            .map_err(Error::StoreFlush)?;
        self.file
            .write_all(&self.buffer)
            .map_err(Error::StoreFlush)?;

        self.len += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Write `bytes` directly to disk at the durable end.
    fn write_direct(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.file
            .seek(SeekFrom::Start(self.len))
            .map_err(Error::StoreWrite)?;
        self.file.write_all(bytes).map_err(Error::StoreWrite)?;
        self.len += bytes.len() as u64;
        Ok(())
    }
}

/// Append-only scratch file with a bounded RAM write buffer and mapped reads.
///
/// Data staged in the buffer is addressable by the offsets handed out by
/// [`write`](DumpStore::write) even before it reaches disk; a
/// [`read`](DumpStore::read) flushes the buffer first. The store never
/// rewrites or erases, and the file is removed when the store is dropped.
pub struct DumpStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl DumpStore {
    /// Create a store at the given path with the default buffer capacity.
    pub fn create(path: impl AsRef<Path>) -> Result<DumpStore, Error> {
        Self::with_capacity(path, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a store with an explicit write buffer capacity.
    pub fn with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<DumpStore, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|_| Error::StoreOpen(path.display().to_string()))?;

        Ok(DumpStore {
            path,
            inner: Mutex::new(Inner {
                file,
                len: 0,
                buffer: Vec::with_capacity(capacity),
                capacity,
            }),
        })
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durable logical size of the store, excluding the buffered tail.
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    /// Whether nothing has been flushed to disk yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `bytes`, returning the logical offset they will be readable at.
    ///
    /// Writes that fit the remaining buffer are staged in RAM and
    /// acknowledged immediately. A write that does not fit flushes the
    /// buffer; if it exceeds the buffer capacity outright it goes straight
    /// to disk, otherwise it seeds the emptied buffer.
    pub fn write(&self, bytes: &[u8]) -> Result<u64, Error> {
        let mut inner = self.inner.lock();

        if inner.buffer.len() + bytes.len() <= inner.capacity {
            let offset = inner.len + inner.buffer.len() as u64;
            inner.buffer.extend_from_slice(bytes);
            return Ok(offset);
        }

        inner.flush()?;

        let offset = inner.len;

        if bytes.len() > inner.capacity {
            inner.write_direct(bytes)?;
        } else {
            inner.buffer.extend_from_slice(bytes);
        }

        Ok(offset)
    }

    /// Map `size` bytes at `offset` for reading.
    ///
    /// Only offsets previously returned by [`write`](DumpStore::write) are
    /// defined. Any buffered tail is flushed first so the offset is
    /// addressable on disk; the file is grown if the mapping extends past
    /// its current end.
    pub fn read(&self, offset: u64, size: usize) -> Result<MappedChunk, Error> {
        let mut inner = self.inner.lock();

        inner.flush()?;

        let required = offset + size as u64;
        let file_len = inner.file.metadata().map_err(Error::StoreFlush)?.len();

        if file_len < required {
            inner
                .file
                .set_len(required)
                .map_err(|e| Error::StoreMap(offset, e))?;
        }

        let map_offset = (offset / MAP_GRANULARITY) * MAP_GRANULARITY;
        let start = (offset - map_offset) as usize;
        let view_len = start + size;

        let map = unsafe {
            MmapOptions::new()
                .offset(map_offset)
                .len(view_len)
                .map(&inner.file)
                .map_err(|e| Error::StoreMap(offset, e))?
        };

        Ok(MappedChunk {
            map,
            start,
            len: size,
            map_offset,
        })
    }
}

impl Drop for DumpStore {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
