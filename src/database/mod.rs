//! Core storage engine data structures (§4 of the design).
//!
//! - `dict`: incrementally-rehashing chained hash table backing the
//!   keyspace and hash values.
//! - `intset`: packed sorted integer array.
//! - `set`: adaptive `IntSet → Dict` member set.
//! - `bitmap`: byte-addressable bit operations over string values.
//! - `siphash`: process-global keyed hash used by every `Dict`.
//! - `expire`: key → deadline index with bounded sampling sweep.
//! - `keyspace`: the top-level `Db` tying all of the above together.
//! - `types`: the `Value` enum stored under each keyspace key.

pub mod bitmap;
pub mod dict;
pub mod expire;
pub mod intset;
pub mod keyspace;
pub mod set;
pub mod siphash;
pub mod types;

pub use bitmap::Bitmap;
pub use dict::{Dict, DictIter, Entry};
pub use expire::{ExpireIndex, MAX_EXPIRE_LOOKUPS_PER_CYCLE};
pub use intset::{IntSet, IntSetIter};
pub use keyspace::{Db, DEFAULT_MAX_LIST_SIZE};
pub use set::SetValue;
pub use siphash::SipHashKey;
pub use types::Value;
