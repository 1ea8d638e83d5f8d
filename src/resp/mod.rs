//! RESP (REdis Serialization Protocol) codec (§4.6).
//!
//! `Frame` is the in-memory representation of one wire value. `Parser`
//! consumes bytes incrementally and yields complete frames, leaving any
//! trailing partial frame buffered for the next call — a connection's
//! read loop feeds it whatever arrived on the socket and drains zero or
//! more frames per call.
//!
//! Client commands arrive as a top-level `Array` of `BulkString`s; the
//! parser also accepts bare "inline commands" (a line of
//! whitespace-separated tokens not starting with `*`), normalizing them to
//! the same shape before the dispatcher ever sees them (§4.6 supplement).

mod decoder;
mod encoder;

pub use decoder::{ParseError, Parser};

/// One RESP value, client command, or server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Simple(Vec<u8>),
    Error(Vec<u8>),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Frame>>),
}

impl Frame {
    pub fn simple(s: impl Into<Vec<u8>>) -> Self {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<Vec<u8>>) -> Self {
        Frame::Error(s.into())
    }

    pub fn bulk(s: impl Into<Vec<u8>>) -> Self {
        Frame::Bulk(Some(s.into()))
    }

    pub fn null_bulk() -> Self {
        Frame::Bulk(None)
    }

    pub fn null_array() -> Self {
        Frame::Array(None)
    }

    pub fn array(items: Vec<Frame>) -> Self {
        Frame::Array(Some(items))
    }

    pub fn ok() -> Self {
        Frame::Simple(b"OK".to_vec())
    }

    /// Extracts a command frame (`Array` of `Bulk`s) into its argument
    /// vector, or `None` if this isn't a well-formed command frame.
    pub fn into_command_args(self) -> Option<Vec<Vec<u8>>> {
        match self {
            Frame::Array(Some(items)) => items
                .into_iter()
                .map(|f| match f {
                    Frame::Bulk(Some(b)) => Some(b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        encoder::encode(self, out);
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }
}
