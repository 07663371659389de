//! Storage backend trait definition.

use crate::error::{StorageError, StorageResult};

/// An append-only byte log used as the host persistence facility.
///
/// # Invariants
///
/// - `append` returns the offset the data starts at, which is the size before the call
/// - `read_at` returns exactly the bytes previously appended at that range
/// - after `sync` returns, every appended byte survives process exit
/// - `truncate` only shrinks; it is used to cut a torn tail after a crash
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if the range is not fully inside
    /// the log, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` to the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Makes all appended data durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be synced.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Shrinks the log to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TruncateBeyondEnd`] if `new_size` is larger
    /// than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String;

    /// Reads the entire log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log is larger than addressable memory or the
    /// read fails.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| StorageError::ReadPastEnd {
            offset: 0,
            len: usize::MAX,
            size,
        })?;
        self.read_at(0, len)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
