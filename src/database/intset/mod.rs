pub mod intset_base;

pub use intset_base::{IntSet, IntSetIter, IntSetRangeIter};
