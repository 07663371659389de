//! Dump-journal command implementation.

use chatdb_core::journal::{decode_frames, JournalOp};
use chatdb_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// Journal record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset of the frame in the journal file.
    pub offset: u64,
    /// Transaction ID.
    pub txid: u64,
    /// Sequence number.
    pub sequence: u64,
    /// Writes in the record.
    pub ops: Vec<OpInfo>,
}

/// One write of a record.
#[derive(Debug, Serialize)]
pub struct OpInfo {
    /// `put` or `delete`.
    pub op: &'static str,
    /// Target collection.
    pub collection: String,
    /// Primary key.
    pub key: String,
}

impl From<&JournalOp> for OpInfo {
    fn from(op: &JournalOp) -> Self {
        let kind = match op {
            JournalOp::Put { .. } => "put",
            JournalOp::Delete { .. } => "delete",
        };
        Self {
            op: kind,
            collection: op.collection().to_string(),
            key: op.key().to_string(),
        }
    }
}

/// Runs the dump-journal command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path.join("journal.log");

    if !journal_path.exists() {
        return Err(format!("No journal found at {}", journal_path.display()).into());
    }

    let backend = FileBackend::open(&journal_path)?;
    let data = backend.read_all()?;
    let replay = decode_frames(&data)?;

    let records: Vec<RecordInfo> = replay
        .records
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(offset, record)| RecordInfo {
            offset: *offset,
            txid: record.txid.as_u64(),
            sequence: record.sequence.as_u64(),
            ops: record.ops.iter().map(OpInfo::from).collect(),
        })
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
            let torn = data.len() as u64 - replay.valid_len;
            if torn > 0 {
                println!("Torn tail: {torn} bytes past the last complete frame");
            }
        }
    }

    Ok(())
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Journal Records");
    println!("===============");
    println!();

    for record in records {
        println!(
            "@{:08x} txn {} seq {} ({} ops)",
            record.offset,
            record.txid,
            record.sequence,
            record.ops.len()
        );
        for op in &record.ops {
            println!("    {:<6} {}/{}", op.op, op.collection, op.key);
        }
    }

    println!();
    println!("Total: {} records", records.len());
}
