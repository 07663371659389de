//! Store configuration.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Nothing survives the handle.
    InMemory,
    /// A store directory holding `LOCK`, `MANIFEST` and `journal.log`.
    Directory(PathBuf),
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => f.write_str("memory"),
            Self::Directory(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Where the data lives.
    pub location: StoreLocation,

    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the journal on every commit.
    pub sync_on_commit: bool,

    /// Whether the host persistence facility may be used at all.
    ///
    /// When false, opening a directory store fails with
    /// `StorageUnavailable`. In-memory stores ignore this flag.
    pub persistence_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::InMemory,
            create_if_missing: true,
            sync_on_commit: true,
            persistence_enabled: true,
        }
    }
}

impl StoreConfig {
    /// Creates an in-memory configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for a store directory at `path`.
    #[must_use]
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self::default().location(StoreLocation::Directory(path.as_ref().to_path_buf()))
    }

    /// Sets the store location.
    #[must_use]
    pub fn location(mut self, location: StoreLocation) -> Self {
        self.location = location;
        self
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the journal on every commit.
    #[must_use]
    pub fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether persistence is permitted.
    #[must_use]
    pub fn persistence_enabled(mut self, value: bool) -> Self {
        self.persistence_enabled = value;
        self
    }

    /// Returns true if the configuration points at a directory.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.location, StoreLocation::Directory(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.location, StoreLocation::InMemory);
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
        assert!(config.persistence_enabled);
        assert!(!config.is_persistent());
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::at("/tmp/chat")
            .create_if_missing(false)
            .sync_on_commit(false)
            .persistence_enabled(false);

        assert!(config.is_persistent());
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert!(!config.persistence_enabled);
        assert_eq!(config.location.to_string(), "/tmp/chat");
    }
}
