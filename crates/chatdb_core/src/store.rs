//! Store facade and recovery.

use crate::config::{StoreConfig, StoreLocation};
use crate::dir::StoreDir;
use crate::error::{StoreError, StoreResult};
use crate::journal::{Journal, JournalRecord};
use crate::manifest::Manifest;
use crate::runner::TransactionRunner;
use crate::schema::{CollectionSpec, Schema, SchemaChange, SchemaUpgrade};
use crate::state::StoreState;
use crate::stats::{CollectionStats, IndexStats, StoreStats};
use crate::transaction::Transaction;
use crate::types::{SchemaVersion, SequenceNumber, TransactionId, TransactionMode};
use chatdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// An open entity store.
///
/// `Store` is an explicit handle: open it once, pass it by reference to
/// whatever needs it, close it (or drop it) when done.
///
/// # Opening
///
/// ```rust,ignore
/// use chatdb_core::{Store, StoreConfig};
///
/// let store = Store::open(StoreConfig::at("chat-data"))?;
/// let scratch = Store::open_in_memory()?;
/// ```
///
/// A directory store holds an exclusive lock for its lifetime. Failing to
/// reach the directory is reported as `StorageUnavailable`, which callers
/// typically answer by opening an in-memory store instead.
pub struct Store {
    config: StoreConfig,
    dir: Option<StoreDir>,
    journal: Mutex<Journal>,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
    is_open: RwLock<bool>,
}

impl Store {
    /// Opens a store as described by `config`.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable` if persistence is disabled or the directory
    ///   cannot be created, opened or locked
    /// - `Corruption`/`ChecksumMismatch` if the manifest or a complete
    ///   journal frame is damaged
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let path = match &config.location {
            StoreLocation::InMemory => {
                return Self::open_with_backend(config, Box::new(InMemoryBackend::new()));
            }
            StoreLocation::Directory(path) => path.clone(),
        };

        if !config.persistence_enabled {
            return Err(StoreError::storage_unavailable(
                path.display().to_string(),
                "persistence is disabled",
            ));
        }

        let dir = StoreDir::open(&path, config.create_if_missing)?;
        let manifest = dir.load_manifest()?.unwrap_or_default();
        let backend = FileBackend::open(&dir.journal_path())?;

        Self::assemble(config, Some(dir), manifest, Box::new(backend))
    }

    /// Opens a store over an arbitrary journal backend.
    ///
    /// There is no directory, so the schema lives only as long as the
    /// handle; rows replayed from the backend are held until the schema
    /// defines their collection again.
    pub fn open_with_backend(
        config: StoreConfig,
        backend: Box<dyn StorageBackend>,
    ) -> StoreResult<Self> {
        Self::assemble(config, None, Manifest::default(), backend)
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(StoreConfig::default())
    }

    fn assemble(
        config: StoreConfig,
        dir: Option<StoreDir>,
        manifest: Manifest,
        backend: Box<dyn StorageBackend>,
    ) -> StoreResult<Self> {
        let mut journal = Journal::new(backend, config.sync_on_commit);
        let records = journal.replay()?;

        let mut state = StoreState::new();
        state.install_manifest(manifest);
        for record in &records {
            state.apply(record);
        }

        info!(
            location = %journal.describe(),
            schema_version = state.manifest.schema_version,
            records = records.len(),
            "store opened"
        );

        Ok(Self {
            config,
            dir,
            journal: Mutex::new(journal),
            state: RwLock::new(state),
            write_lock: Mutex::new(()),
            is_open: RwLock::new(true),
        })
    }

    /// Returns a runner for transaction scopes on this store.
    #[must_use]
    pub fn runner(&self) -> TransactionRunner<'_> {
        TransactionRunner::new(self)
    }

    /// Opens a transaction scope over `collections`.
    ///
    /// Read-write scopes are serialized: a second one waits here until the
    /// first is committed, aborted or dropped.
    ///
    /// # Errors
    ///
    /// `CollectionNotFound` if any named collection is not defined.
    pub fn begin(
        &self,
        collections: &[&str],
        mode: TransactionMode,
    ) -> StoreResult<Transaction<'_>> {
        self.ensure_open()?;
        let writer = (!mode.is_read_only()).then(|| self.write_lock.lock());
        let mut state = self.state.write();
        for name in collections {
            if state.manifest.collection(name).is_none() {
                return Err(StoreError::collection_not_found(*name));
            }
        }

        let id = TransactionId::new(state.next_txid);
        state.next_txid += 1;
        drop(state);

        let scope: BTreeSet<String> = collections.iter().map(|c| (*c).to_string()).collect();
        debug!(txid = %id, %mode, scope = ?scope, "transaction opened");
        Ok(Transaction::new(self, id, mode, scope, writer))
    }

    /// Commits a scope's staged writes as one journal record.
    ///
    /// Returns `None` when the scope wrote nothing.
    pub fn commit(&self, txn: Transaction<'_>) -> StoreResult<Option<SequenceNumber>> {
        self.ensure_open()?;
        // The writer guard is held until the record is applied.
        let (txid, ops, _writer) = txn.into_writes();
        if ops.is_empty() {
            debug!(%txid, "transaction closed without writes");
            return Ok(None);
        }

        let mut state = self.state.write();
        let record = JournalRecord {
            txid,
            sequence: SequenceNumber::new(state.next_seq),
            ops,
        };
        self.journal.lock().append(&record)?;
        state.apply(&record);

        debug!(%txid, sequence = %record.sequence, ops = record.ops.len(), "transaction committed");
        Ok(Some(record.sequence))
    }

    /// Discards a scope's staged writes.
    pub fn abort(&self, txn: Transaction<'_>) {
        let (txid, ops, _) = txn.into_writes();
        debug!(%txid, discarded = ops.len(), "transaction aborted");
    }

    /// Applies `schema` steps up to `target`. See [`crate::SchemaManager`].
    pub(crate) fn upgrade_schema(
        &self,
        schema: &Schema,
        target: SchemaVersion,
    ) -> StoreResult<SchemaUpgrade> {
        self.ensure_open()?;
        let _writer = self.write_lock.lock();
        let mut state = self.state.write();
        let stored = state.manifest.schema_version;
        if stored > target {
            return Err(StoreError::VersionDowngrade { stored, target });
        }

        let mut upgrade = SchemaUpgrade {
            from: stored,
            to: target,
            ..SchemaUpgrade::default()
        };
        if stored == target {
            return Ok(upgrade);
        }

        let mut manifest = state.manifest.clone();
        for step in schema.steps_between(stored, target) {
            for change in &step.changes {
                match change {
                    SchemaChange::CreateCollection { name, key_path } => {
                        if !manifest.collections.contains_key(name) {
                            manifest
                                .collections
                                .insert(name.clone(), CollectionSpec::new(name, key_path));
                            upgrade.created_collections.push(name.clone());
                        }
                    }
                    SchemaChange::CreateIndex { collection, index } => {
                        let spec = manifest
                            .collections
                            .get_mut(collection)
                            .ok_or_else(|| StoreError::collection_not_found(collection))?;
                        if spec.add_index(index.clone()) {
                            upgrade
                                .created_indexes
                                .push((collection.clone(), index.name.clone()));
                        }
                    }
                }
            }
        }
        manifest.schema_version = target;

        if let Some(dir) = &self.dir {
            dir.save_manifest(&manifest)?;
        }
        state.install_manifest(manifest);
        Ok(upgrade)
    }

    /// Returns the schema version the store is at.
    #[must_use]
    pub fn schema_version(&self) -> SchemaVersion {
        self.state.read().manifest.schema_version
    }

    /// Returns the definition of a collection.
    #[must_use]
    pub fn collection_spec(&self, name: &str) -> Option<CollectionSpec> {
        self.state.read().manifest.collection(name).cloned()
    }

    /// Returns true if the store lives in a directory.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// Returns the store directory, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Collects row, index and journal statistics.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.ensure_open()?;
        let journal = self.journal.lock();
        let journal_bytes = journal.size()?;
        let location = journal.describe();
        drop(journal);

        let state = self.state.read();
        let collections = state
            .collections()
            .map(|c| CollectionStats {
                name: c.spec().name.clone(),
                key_path: c.spec().key_path.clone(),
                rows: c.len(),
                indexes: c
                    .index_sizes()
                    .into_iter()
                    .map(|(name, key_path, entries)| IndexStats {
                        name,
                        key_path,
                        entries,
                    })
                    .collect(),
            })
            .collect();

        Ok(StoreStats {
            location,
            persistent: self.is_persistent(),
            schema_version: state.manifest.schema_version,
            committed_seq: state.committed_seq,
            journal_bytes,
            collections,
        })
    }

    /// Syncs the journal, saves the manifest and closes the store.
    ///
    /// Closing twice is a no-op. Every later operation fails with
    /// `StoreClosed`.
    pub fn close(&self) -> StoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.journal.lock().sync()?;
        if let Some(dir) = &self.dir {
            dir.save_manifest(&self.state.read().manifest)?;
        }

        *is_open = false;
        info!("store closed");
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(StoreError::StoreClosed)
        }
    }

    pub(crate) fn state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("location", &self.config.location)
            .field("is_open", &self.is_open())
            .field("schema_version", &self.schema_version())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
