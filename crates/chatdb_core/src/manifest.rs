//! Store manifest: schema version and collection definitions.
//!
//! ```text
//! | magic "CMFT" (4) | CBOR body (N) | crc32 (4) |
//! ```
//!
//! The checksum covers magic and body. Indexes are derived data and are not
//! stored here, only their definitions.

use crate::error::{StoreError, StoreResult};
use crate::schema::CollectionSpec;
use crate::types::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Magic bytes for the manifest file.
pub const MANIFEST_MAGIC: [u8; 4] = *b"CMFT";

/// Current manifest format version.
pub const MANIFEST_FORMAT: u16 = 1;

/// Persisted store metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Layout version of the manifest itself.
    pub format_version: u16,
    /// Schema version the store has been upgraded to; 0 for a fresh store.
    pub schema_version: SchemaVersion,
    /// Collection definitions keyed by name.
    pub collections: BTreeMap<String, CollectionSpec>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            format_version: MANIFEST_FORMAT,
            schema_version: 0,
            collections: BTreeMap::new(),
        }
    }
}

impl Manifest {
    /// Returns the definition of a collection.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.get(name)
    }

    /// Encodes the manifest to bytes.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&MANIFEST_MAGIC);
        ciborium::into_writer(self, &mut buf)?;
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Decodes a manifest from bytes.
    pub fn decode(data: &[u8]) -> StoreResult<Self> {
        if data.len() < MANIFEST_MAGIC.len() + 4 || data[..4] != MANIFEST_MAGIC {
            return Err(StoreError::corruption("invalid manifest magic"));
        }

        let (body, crc_bytes) = data.split_at(data.len() - 4);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch { expected, actual });
        }

        let manifest: Self = ciborium::from_reader(&body[MANIFEST_MAGIC.len()..])
            .map_err(|e| StoreError::corruption(format!("unreadable manifest: {e}")))?;
        if manifest.format_version > MANIFEST_FORMAT {
            return Err(StoreError::corruption(format!(
                "unsupported manifest format: {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSpec;

    fn sample() -> Manifest {
        let mut users = CollectionSpec::new("users", "id");
        users.add_index(IndexSpec::new("username", "username"));
        let mut manifest = Manifest {
            schema_version: 2,
            ..Manifest::default()
        };
        manifest.collections.insert("users".into(), users);
        manifest
    }

    #[test]
    fn encode_decode() {
        let manifest = sample();
        let decoded = Manifest::decode(&manifest.encode().unwrap()).unwrap();
        assert_eq!(decoded, manifest);
        assert!(decoded.collection("users").unwrap().index("username").is_some());
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            Manifest::decode(&bytes),
            Err(StoreError::Corruption { .. })
        ));
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut bytes = sample().encode().unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        assert!(matches!(
            Manifest::decode(&bytes),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }
}
