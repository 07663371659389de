//! Journal writer and replay.

use super::frame::{decode_frames, encode_frame, JournalRecord};
use crate::error::StoreResult;
use chatdb_storage::StorageBackend;
use tracing::{debug, warn};

/// The commit journal over a storage backend.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl Journal {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Appends one record and returns its offset.
    ///
    /// If the append fails part way, or the sync after it fails, the journal
    /// is cut back to its previous length so a failed commit never leaves a
    /// frame behind for replay.
    pub fn append(&mut self, record: &JournalRecord) -> StoreResult<u64> {
        let frame = encode_frame(record)?;
        let start = self.backend.size()?;

        let offset = match self.backend.append(&frame) {
            Ok(offset) => offset,
            Err(err) => {
                self.cut_back(start);
                return Err(err.into());
            }
        };

        if self.sync_on_commit {
            if let Err(err) = self.backend.sync() {
                self.cut_back(offset);
                return Err(err.into());
            }
        }
        Ok(offset)
    }

    fn cut_back(&mut self, len: u64) {
        let result = match self.backend.size() {
            Ok(size) if size > len => self.backend.truncate(len),
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };
        if let Err(undo) = result {
            warn!(error = %undo, len, "could not remove failed journal frame");
        }
    }

    /// Reads every complete record, truncating a torn tail if one is found.
    pub fn replay(&mut self) -> StoreResult<Vec<JournalRecord>> {
        let data = self.backend.read_all()?;
        let replay = decode_frames(&data)?;

        let size = data.len() as u64;
        if replay.valid_len < size {
            warn!(
                journal = %self.backend.describe(),
                valid = replay.valid_len,
                size,
                "truncating torn journal tail"
            );
            self.backend.truncate(replay.valid_len)?;
        }

        debug!(records = replay.records.len(), "journal replayed");
        Ok(replay.records.into_iter().map(|(_, r)| r).collect())
    }

    /// Makes every appended frame durable.
    pub fn sync(&mut self) -> StoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Describes the backend for log lines.
    pub fn describe(&self) -> String {
        self.backend.describe()
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("backend", &self.backend.describe())
            .field("sync_on_commit", &self.sync_on_commit)
            .finish()
    }
}
