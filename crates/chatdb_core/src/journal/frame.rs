//! Journal records and their frame encoding.

use super::{FRAME_HEADER_SIZE, FRAME_TRAILER_SIZE, JOURNAL_MAGIC, JOURNAL_VERSION};
use crate::error::{StoreError, StoreResult};
use crate::types::{SequenceNumber, TransactionId};
use ciborium::Value;
use serde::{Deserialize, Serialize};

/// A single staged write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalOp {
    /// Insert or replace the row stored under `key`.
    Put {
        /// Target collection.
        collection: String,
        /// Primary key.
        key: String,
        /// Full document.
        value: Value,
    },
    /// Remove the row stored under `key`, if any.
    Delete {
        /// Target collection.
        collection: String,
        /// Primary key.
        key: String,
    },
}

impl JournalOp {
    /// Returns the collection this op writes to.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Put { collection, .. } | Self::Delete { collection, .. } => collection,
        }
    }

    /// Returns the primary key this op writes to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key, .. } => key,
        }
    }
}

/// One committed transaction scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Scope that produced the writes.
    pub txid: TransactionId,
    /// Commit order.
    pub sequence: SequenceNumber,
    /// Writes in the order they were staged.
    pub ops: Vec<JournalOp>,
}

/// Result of scanning a journal image.
#[derive(Debug, Default)]
pub struct Replay {
    /// Complete frames in log order, with their start offsets.
    pub records: Vec<(u64, JournalRecord)>,
    /// Length of the prefix made of complete frames.
    pub valid_len: u64,
}

/// Encodes a record into one frame.
pub fn encode_frame(record: &JournalRecord) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(record, &mut payload)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::codec("journal record larger than 4 GiB"))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + FRAME_TRAILER_SIZE);
    frame.extend_from_slice(&JOURNAL_MAGIC);
    frame.push(JOURNAL_VERSION);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Decodes every complete frame in `data`.
///
/// Stops quietly at a torn tail; `valid_len` then tells the caller where to
/// truncate.
pub fn decode_frames(data: &[u8]) -> StoreResult<Replay> {
    let mut replay = Replay::default();
    let mut cursor = 0usize;

    while cursor < data.len() {
        let rest = &data[cursor..];
        if rest.len() < FRAME_HEADER_SIZE {
            break;
        }

        if rest[..4] != JOURNAL_MAGIC {
            return Err(StoreError::corruption(format!(
                "invalid journal magic at offset {cursor}"
            )));
        }
        let version = rest[4];
        if version > JOURNAL_VERSION {
            return Err(StoreError::corruption(format!(
                "unsupported journal version {version} at offset {cursor}"
            )));
        }
        let len = u32::from_le_bytes([rest[5], rest[6], rest[7], rest[8]]) as usize;

        let frame_len = FRAME_HEADER_SIZE + len + FRAME_TRAILER_SIZE;
        if rest.len() < frame_len {
            break;
        }

        let body = &rest[..FRAME_HEADER_SIZE + len];
        let trailer = &rest[FRAME_HEADER_SIZE + len..frame_len];
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch { expected, actual });
        }

        let record: JournalRecord = ciborium::from_reader(&body[FRAME_HEADER_SIZE..])
            .map_err(|e| {
                StoreError::corruption(format!("unreadable journal record at offset {cursor}: {e}"))
            })?;
        replay.records.push((cursor as u64, record));

        cursor += frame_len;
        replay.valid_len = cursor as u64;
    }

    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: u64) -> JournalRecord {
        JournalRecord {
            txid: TransactionId::new(seq),
            sequence: SequenceNumber::new(seq),
            ops: vec![
                JournalOp::Put {
                    collection: "messages".into(),
                    key: format!("m{seq}"),
                    value: Value::Map(vec![(
                        Value::Text("id".into()),
                        Value::Text(format!("m{seq}")),
                    )]),
                },
                JournalOp::Delete {
                    collection: "friend_requests".into(),
                    key: "r1".into(),
                },
            ],
        }
    }

    #[test]
    fn frames_decode_in_order() {
        let mut log = encode_frame(&record(1)).unwrap();
        let second_at = log.len() as u64;
        log.extend(encode_frame(&record(2)).unwrap());

        let replay = decode_frames(&log).unwrap();
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[1], (second_at, record(2)));
        assert_eq!(replay.valid_len, log.len() as u64);
    }

    #[test]
    fn torn_tail_is_dropped() {
        let mut log = encode_frame(&record(1)).unwrap();
        let complete = log.len();
        let second = encode_frame(&record(2)).unwrap();

        for cut in [1, FRAME_HEADER_SIZE, second.len() - 1] {
            let mut torn = log.clone();
            torn.extend_from_slice(&second[..cut]);
            let replay = decode_frames(&torn).unwrap();
            assert_eq!(replay.records.len(), 1);
            assert_eq!(replay.valid_len, complete as u64);
        }

        log.extend(second);
        assert_eq!(decode_frames(&log).unwrap().records.len(), 2);
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        let mut log = encode_frame(&record(1)).unwrap();
        log[FRAME_HEADER_SIZE + 2] ^= 0x55;
        assert!(matches!(
            decode_frames(&log),
            Err(StoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut log = encode_frame(&record(1)).unwrap();
        log[0] = b'X';
        assert!(matches!(
            decode_frames(&log),
            Err(StoreError::Corruption { .. })
        ));
    }

    #[test]
    fn op_accessors() {
        let op = JournalOp::Delete {
            collection: "users".into(),
            key: "u1".into(),
        };
        assert_eq!(op.collection(), "users");
        assert_eq!(op.key(), "u1");
    }
}
