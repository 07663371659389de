//! Secondary indexes.
//!
//! Indexes are non-unique equality indexes over a single top-level field of
//! a document. They are derived data: rebuilt from rows on open and
//! backfilled when the schema adds them to a populated collection.

mod hash;
mod key;

pub use hash::HashIndex;
pub use key::IndexKey;
