//! Store directory management.
//!
//! ```text
//! <store_path>/
//! ├─ LOCK          # advisory exclusive lock, held for the handle's lifetime
//! ├─ MANIFEST      # schema version and collection definitions
//! └─ journal.log   # append-only commit journal
//! ```

use crate::error::{StoreError, StoreResult};
use crate::manifest::Manifest;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "MANIFEST";
const MANIFEST_TEMP: &str = "MANIFEST.tmp";
const LOCK_FILE: &str = "LOCK";
const JOURNAL_FILE: &str = "journal.log";

/// An opened, exclusively locked store directory.
///
/// Every failure to reach a usable directory is reported as
/// [`StoreError::StorageUnavailable`], so callers can fall back to an
/// in-memory store.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens (and optionally creates) a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the directory is missing and
    /// `create_if_missing` is false, if the path is not a directory, or if
    /// another handle holds the lock.
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        let location = path.display().to_string();

        if !path.exists() {
            if !create_if_missing {
                return Err(StoreError::storage_unavailable(
                    location,
                    "directory does not exist",
                ));
            }
            fs::create_dir_all(path)
                .map_err(|e| StoreError::storage_unavailable(location.clone(), e))?;
        }

        if !path.is_dir() {
            return Err(StoreError::storage_unavailable(location, "not a directory"));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))
            .map_err(|e| StoreError::storage_unavailable(location.clone(), e))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::storage_unavailable(
                location,
                "locked by another handle",
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the journal file.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }

    /// Returns the path to the MANIFEST file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILE)
    }

    /// Loads the manifest, or `None` for a fresh directory.
    pub fn load_manifest(&self) -> StoreResult<Option<Manifest>> {
        let manifest_path = self.manifest_path();
        if !manifest_path.exists() {
            return Ok(None);
        }

        let data = fs::read(&manifest_path)?;
        if data.is_empty() {
            return Ok(None);
        }
        Manifest::decode(&data).map(Some)
    }

    /// Saves the manifest atomically: write temp, fsync, rename, fsync dir.
    pub fn save_manifest(&self, manifest: &Manifest) -> StoreResult<()> {
        let temp_path = self.path.join(MANIFEST_TEMP);
        let data = manifest.encode()?;

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.manifest_path())?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced
        Ok(())
    }
}
