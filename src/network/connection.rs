//! Per-client connection state (§4.8, §5 "Scoped acquisition"): a
//! non-blocking `mio::net::TcpStream` plus the buffering a single
//! readiness-driven reactor needs to read commands and queue replies
//! without ever blocking the event loop thread.

use std::io::{self, Read, Write};

use bytes::BytesMut;
use mio::net::TcpStream;

use crate::resp::{Frame, ParseError, Parser};

/// Bytes read from the socket per readable event (§5 resource bounds).
const READ_CHUNK: usize = 1024;

pub enum ReadOutcome {
    /// One or more commands were parsed; the connection stays open.
    Commands(Vec<Vec<Vec<u8>>>),
    /// Bytes were read (or none were available yet) but no complete
    /// command is buffered — e.g. a command split across TCP segments, or
    /// a `WouldBlock` wakeup. The connection stays open (§4.6 "tolerate
    /// partial input").
    NoCommands,
    /// The peer closed its write half, or the socket errored.
    Closed,
    /// A malformed frame was seen; the connection must be torn down
    /// (§7, Protocol errors are fatal to the connection).
    ProtocolError(ParseError),
}

/// One connected client: its socket plus inbound parse state and an
/// outbound byte queue (§4.8).
pub struct Connection {
    pub stream: TcpStream,
    parser: Parser,
    write_buf: Vec<u8>,
    write_pos: usize,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            parser: Parser::new(),
            write_buf: Vec::new(),
            write_pos: 0,
        }
    }

    /// Drains whatever is currently available on the socket into the
    /// parser, non-blocking. `WouldBlock` just means "nothing more right
    /// now" and isn't an error (§4.8).
    pub fn read_commands(&mut self) -> ReadOutcome {
        let mut chunk = BytesMut::zeroed(READ_CHUNK);
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return self.drain_parsed_or(ReadOutcome::Closed),
                Ok(n) => {
                    self.parser.feed(&chunk[..n]);
                    if n < READ_CHUNK {
                        return self.drain_parsed();
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return self.drain_parsed();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return self.drain_parsed_or(ReadOutcome::Closed),
            }
        }
    }

    fn drain_parsed(&mut self) -> ReadOutcome {
        self.drain_parsed_or(ReadOutcome::NoCommands)
    }

    /// Pulls every complete command currently buffered; `on_empty` is
    /// returned verbatim if none are ready (used to distinguish "closed
    /// with no trailing command" from "just no data yet" at call sites
    /// that only care about the command list).
    fn drain_parsed_or(
        &mut self,
        on_empty: ReadOutcome,
    ) -> ReadOutcome {
        let mut commands = Vec::new();
        loop {
            match self.parser.next_command() {
                Ok(Some(cmd)) => commands.push(cmd),
                Ok(None) => break,
                Err(e) => return ReadOutcome::ProtocolError(e),
            }
        }
        if commands.is_empty() {
            on_empty
        } else {
            ReadOutcome::Commands(commands)
        }
    }

    /// Queues a reply frame for writing; does not write synchronously —
    /// the reactor flushes on the next writable event.
    pub fn queue_reply(
        &mut self,
        frame: &Frame,
    ) {
        frame.serialize_into(&mut self.write_buf);
    }

    pub fn has_pending_writes(&self) -> bool {
        self.write_pos < self.write_buf.len()
    }

    /// Writes as much of the pending buffer as the socket accepts right
    /// now. Returns `Ok(true)` once everything queued has been flushed.
    pub fn flush(&mut self) -> io::Result<bool> {
        while self.write_pos < self.write_buf.len() {
            match self.stream.write(&self.write_buf[self.write_pos..]) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => self.write_pos += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.write_buf.clear();
        self.write_pos = 0;
        Ok(true)
    }
}
