//! Typed error hierarchy (§7), one variant per error kind the wire
//! protocol distinguishes. The dispatcher is the only place that turns a
//! `CommandError` into a [`Frame::Error`](crate::resp::Frame::Error) — the
//! "validation errors raised as exceptions at the source's command
//! boundary" redesign (§9) becomes an ordinary `Result` returned from
//! every command handler instead.

use thiserror::Error;

use crate::resp::Frame;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    Arity(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR bit is not an integer or out of range")]
    BitNotAnInteger,

    #[error("ERR bit offset is not an integer or out of range")]
    BitOffsetOutOfRange,

    #[error("ERR hash value is not an integer")]
    HashValueNotAnInteger,

    #[error("ERR increment or decrement would overflow")]
    Overflow,

    #[error("ERR increment would produce NaN or Infinity")]
    NotFinite,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR {0}")]
    Other(String),
}

impl CommandError {
    /// Converts a validation failure into the RESP error reply the
    /// dispatcher writes back to the client. Unlike a protocol error,
    /// this never closes the connection (§7 recovery policy).
    pub fn to_frame(&self) -> Frame {
        Frame::error(self.to_string())
    }
}
