//! Fault injection for the journal backend.
//!
//! A [`FlakyBackend`] wraps a real backend and fails the appends a shared
//! [`FaultPlan`] marks. A failed append writes nothing, a torn one writes
//! the first half of its data before failing. The plan stays with the test while the backend is
//! moved into the store, so faults can be armed at any point.
//!
//! Only commits that write something append to the journal; a scope that
//! stages nothing never reaches the backend and does not advance the count.

use chatdb_storage::{StorageBackend, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Which journal appends should fail.
#[derive(Debug, Default)]
pub struct FaultPlan {
    appends: AtomicU64,
    failed: AtomicU64,
    fail_at: Mutex<BTreeSet<u64>>,
    tear_at: Mutex<BTreeSet<u64>>,
    fail_all: AtomicBool,
    fail_sync: AtomicBool,
}

impl FaultPlan {
    /// Creates a plan with no faults.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fails the `n`th append from now (1-based).
    pub fn fail_nth_append(&self, n: u64) {
        assert!(n > 0, "appends are counted from 1");
        let at = self.appends.load(Ordering::SeqCst) + n;
        self.fail_at.lock().insert(at);
    }

    /// Tears the `n`th append from now (1-based): half the data is
    /// written, then the append fails.
    pub fn tear_nth_append(&self, n: u64) {
        assert!(n > 0, "appends are counted from 1");
        let at = self.appends.load(Ordering::SeqCst) + n;
        self.tear_at.lock().insert(at);
    }

    /// Fails every append until [`heal`](Self::heal).
    pub fn fail_all_appends(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Fails every sync until [`heal`](Self::heal).
    pub fn fail_syncs(&self) {
        self.fail_sync.store(true, Ordering::SeqCst);
    }

    /// Clears every armed fault.
    pub fn heal(&self) {
        self.fail_at.lock().clear();
        self.tear_at.lock().clear();
        self.fail_all.store(false, Ordering::SeqCst);
        self.fail_sync.store(false, Ordering::SeqCst);
    }

    /// Appends attempted so far, failed ones included.
    pub fn appends(&self) -> u64 {
        self.appends.load(Ordering::SeqCst)
    }

    /// Appends failed so far.
    pub fn failures(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    fn on_append(&self) -> Fault {
        let n = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        let fault = if self.fail_all.load(Ordering::SeqCst) || self.fail_at.lock().remove(&n) {
            Fault::Fail
        } else if self.tear_at.lock().remove(&n) {
            Fault::Tear
        } else {
            return Fault::None;
        };
        self.failed.fetch_add(1, Ordering::SeqCst);
        fault
    }
}

enum Fault {
    None,
    Fail,
    Tear,
}

/// A backend that fails appends according to a [`FaultPlan`].
pub struct FlakyBackend {
    inner: Box<dyn StorageBackend>,
    plan: Arc<FaultPlan>,
}

impl FlakyBackend {
    /// Wraps `inner`, failing what `plan` says.
    pub fn new(inner: Box<dyn StorageBackend>, plan: Arc<FaultPlan>) -> Self {
        Self { inner, plan }
    }
}

fn injected(what: &str) -> StorageError {
    StorageError::Io(io::Error::new(
        io::ErrorKind::Other,
        format!("injected {what} failure"),
    ))
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        match self.plan.on_append() {
            Fault::None => self.inner.append(data),
            Fault::Fail => Err(injected("append")),
            Fault::Tear => {
                self.inner.append(&data[..data.len() / 2])?;
                Err(injected("torn append"))
            }
        }
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.plan.fail_sync.load(Ordering::SeqCst) {
            return Err(injected("sync"));
        }
        self.inner.sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }

    fn describe(&self) -> String {
        format!("flaky({})", self.inner.describe())
    }
}
