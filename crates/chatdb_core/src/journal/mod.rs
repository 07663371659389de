//! Commit journal.
//!
//! Every committed transaction scope is appended as one frame, so a scope's
//! writes are applied all-or-nothing on replay.
//!
//! ## Frame Format
//!
//! ```text
//! | magic "CJNL" (4) | version (1) | length u32 LE (4) | CBOR payload (N) | crc32 LE (4) |
//! ```
//!
//! The checksum covers header and payload.
//!
//! ## Recovery Policy
//!
//! - A frame cut short by a crash (short header or short payload at the end
//!   of the log) is a torn tail: it is truncated away and replay succeeds
//!   with the frames before it.
//! - A checksum mismatch, bad magic or unknown version on a complete frame
//!   is fatal and the store refuses to open.

mod frame;
mod writer;

pub use frame::{decode_frames, encode_frame, JournalOp, JournalRecord, Replay};
pub use writer::Journal;

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"CJNL";

/// Current frame version.
pub const JOURNAL_VERSION: u8 = 1;

/// magic (4) + version (1) + length (4)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Trailing crc32.
pub const FRAME_TRAILER_SIZE: usize = 4;
