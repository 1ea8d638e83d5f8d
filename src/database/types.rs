//! The typed values a keyspace entry can hold (§3).

use crate::database::{dict::Dict, set::SetValue};

/// One keyspace value. The keyspace itself is `Dict<Vec<u8>, Value>`; a
/// key maps to exactly one of these at a time.
#[derive(Debug, Clone)]
pub enum Value {
    /// A byte string, also addressable as a bitmap (§4.5).
    Str(Vec<u8>),
    /// Field → value mapping, backed by a `Dict` (§3, "Hash value").
    Hash(Dict<Vec<u8>, Vec<u8>>),
    /// Adaptive integer-or-hash member set (§4.4).
    Set(SetValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Hash(_) => "hash",
            Value::Set(_) => "set",
        }
    }

    pub fn as_str(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Dict<Vec<u8>, Vec<u8>>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut Dict<Vec<u8>, Vec<u8>>> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetValue> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut SetValue> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }
}
