pub mod dict_base;
pub mod entry;

pub use dict_base::{Dict, DictIter};
pub use entry::Entry;
