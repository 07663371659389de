//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A log stored in a single file.
///
/// The file is opened read/write and every append goes to its end. `sync`
/// flushes and calls `File::sync_all`, so a synced append survives power loss
/// on file systems that honour fsync.
///
/// # Example
///
/// ```no_run
/// use chatdb_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("journal.log")).unwrap();
/// backend.append(b"record").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens the file at `path`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the file cannot be opened.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let unavailable = |source| StorageError::Unavailable {
            path: path.to_path_buf(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(unavailable)?;
        let size = file.metadata().map_err(unavailable)?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { file, size }),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        inner.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        inner.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let inner = self.inner.get_mut();
        let offset = inner.size;
        if data.is_empty() {
            return Ok(offset);
        }

        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(data)?;
        inner.size += data.len() as u64;
        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        inner.file.flush()?;
        inner.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().size)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        if new_size > inner.size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: inner.size,
            });
        }
        inner.file.set_len(new_size)?;
        inner.file.sync_all()?;
        inner.size = new_size;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appended_bytes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"first").unwrap();
            backend.append(b"second").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(5, 6).unwrap(), b"second");
    }

    #[test]
    fn truncate_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"keep-drop").unwrap();
        backend.truncate(4).unwrap();
        drop(backend);

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.read_all().unwrap(), b"keep");
    }

    #[test]
    fn missing_parent_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("journal.log");

        let err = FileBackend::open(&path).unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn describe_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");
        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.describe().ends_with("journal.log"));
    }
}
