//! Parsing half of the RESP codec (§4.6).
//!
//! [`Parser`] buffers whatever bytes arrive from the socket and pulls zero
//! or more complete frames out of them, leaving a trailing partial frame
//! untouched until more bytes arrive — the coroutine-style scanner the
//! teacher's ZSP decoder used is re-architected here as an explicit
//! buffer-and-rescan state machine (§9 "coroutine-style RESP streaming"),
//! not an internal resumable state per frame kind: each call simply
//! attempts a full parse of the buffered bytes and, on success, drains
//! the consumed prefix.

use thiserror::Error;

use super::Frame;

/// Frames nest at most this deep; guards against unbounded recursion on a
/// maliciously crafted `*` count.
const MAX_ARRAY_DEPTH: usize = 64;
/// Bulk strings/line lengths above this are rejected rather than causing
/// an unbounded allocation from a bogus length header.
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseError {
    #[error("Protocol error: invalid {0}")]
    Invalid(&'static str),
    #[error("Protocol error: unbalanced quotes in request")]
    UnbalancedQuotes,
    #[error("Protocol error: too many nested arrays")]
    TooDeep,
    #[error("Protocol error: invalid bulk length")]
    InvalidBulkLen,
    #[error("Protocol error: invalid multibulk length")]
    InvalidMultibulkLen,
}

/// Incremental RESP frame reader over a byte stream.
pub struct Parser {
    buf: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends freshly read bytes to the internal buffer.
    pub fn feed(
        &mut self,
        bytes: &[u8],
    ) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Attempts to pull one complete frame out of the buffered bytes.
    /// `Ok(None)` means "not enough data yet" — callers should `feed` more
    /// and try again. `Err` is fatal to the connection (§7, Protocol).
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ParseError> {
        match parse_frame(&self.buf, 0)? {
            Some((frame, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }

    /// Pulls one client command: an `Array` of `Bulk`s, or an inline
    /// command line (§4.6 supplement) normalized to the same shape.
    /// Returns `Ok(None)` when more bytes are needed.
    pub fn next_command(&mut self) -> Result<Option<Vec<Vec<u8>>>, ParseError> {
        match self.buf.first() {
            None => Ok(None),
            Some(b'*') => match self.next_frame()? {
                None => Ok(None),
                Some(frame) => frame
                    .into_command_args()
                    .ok_or(ParseError::Invalid("command frame"))
                    .map(Some),
            },
            Some(b'+') | Some(b'-') | Some(b':') | Some(b'$') => {
                // A bare reply-type frame at the command boundary isn't a
                // valid client request.
                Err(ParseError::Invalid("command frame"))
            }
            Some(_) => self.next_inline_command(),
        }
    }

    fn next_inline_command(&mut self) -> Result<Option<Vec<Vec<u8>>>, ParseError> {
        let Some(nl) = self.buf.iter().position(|&b| b == b'\n') else {
            if self.buf.len() > MAX_BULK_LEN as usize {
                return Err(ParseError::Invalid("inline request too long"));
            }
            return Ok(None);
        };

        let mut line_end = nl;
        if line_end > 0 && self.buf[line_end - 1] == b'\r' {
            line_end -= 1;
        }
        let line = self.buf[..line_end].to_vec();
        self.buf.drain(..=nl);

        let args = split_inline_args(&line)?;
        Ok(Some(args))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits an inline command line on whitespace, honoring single/double
/// quoted tokens the way an interactive `redis-cli`/telnet client expects.
fn split_inline_args(line: &[u8]) -> Result<Vec<Vec<u8>>, ParseError> {
    let mut args = Vec::new();
    let mut i = 0;
    let len = line.len();

    while i < len {
        while i < len && line[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }

        let mut current = Vec::new();
        if line[i] == b'"' {
            i += 1;
            let mut closed = false;
            while i < len {
                match line[i] {
                    b'"' => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    b'\\' if i + 1 < len => {
                        current.push(line[i + 1]);
                        i += 2;
                    }
                    b => {
                        current.push(b);
                        i += 1;
                    }
                }
            }
            if !closed {
                return Err(ParseError::UnbalancedQuotes);
            }
        } else if line[i] == b'\'' {
            i += 1;
            let mut closed = false;
            while i < len {
                if line[i] == b'\'' {
                    closed = true;
                    i += 1;
                    break;
                }
                current.push(line[i]);
                i += 1;
            }
            if !closed {
                return Err(ParseError::UnbalancedQuotes);
            }
        } else {
            while i < len && !line[i].is_ascii_whitespace() {
                current.push(line[i]);
                i += 1;
            }
        }
        args.push(current);
    }

    Ok(args)
}

/// Parses one frame starting at `buf[pos..]`. Returns the frame and total
/// bytes consumed (relative to `pos`'s own start, i.e. absolute length
/// from 0 when called at the top level), or `None` if more data is
/// needed.
fn parse_frame(
    buf: &[u8],
    depth: usize,
) -> Result<Option<(Frame, usize)>, ParseError> {
    if depth > MAX_ARRAY_DEPTH {
        return Err(ParseError::TooDeep);
    }
    if buf.is_empty() {
        return Ok(None);
    }

    match buf[0] {
        b'+' => parse_line(buf, 1).map(|o| o.map(|(line, n)| (Frame::Simple(line), n))),
        b'-' => parse_line(buf, 1).map(|o| o.map(|(line, n)| (Frame::Error(line), n))),
        b':' => parse_integer_line(buf, 1)
            .map(|o| o.map(|(n, consumed)| (Frame::Integer(n), consumed))),
        b'$' => parse_bulk(buf),
        b'*' => parse_array(buf, depth),
        _ => Err(ParseError::Invalid("frame type byte")),
    }
}

/// Reads one CRLF-terminated line starting at `buf[start..]`, returning
/// the line bytes (without CRLF) and total bytes consumed from 0.
fn parse_line(
    buf: &[u8],
    start: usize,
) -> Result<Option<(Vec<u8>, usize)>, ParseError> {
    let Some(rel) = buf[start..].windows(2).position(|w| w == b"\r\n") else {
        return Ok(None);
    };
    let end = start + rel;
    Ok(Some((buf[start..end].to_vec(), end + 2)))
}

fn parse_integer_line(
    buf: &[u8],
    start: usize,
) -> Result<Option<(i64, usize)>, ParseError> {
    match parse_line(buf, start)? {
        None => Ok(None),
        Some((line, consumed)) => {
            let s = std::str::from_utf8(&line).map_err(|_| ParseError::Invalid("integer"))?;
            let n = s.parse::<i64>().map_err(|_| ParseError::Invalid("integer"))?;
            Ok(Some((n, consumed)))
        }
    }
}

fn parse_bulk(buf: &[u8]) -> Result<Option<(Frame, usize)>, ParseError> {
    let Some((len, header_len)) = parse_integer_line(buf, 1)? else {
        return Ok(None);
    };

    if len == -1 {
        return Ok(Some((Frame::Bulk(None), header_len)));
    }
    if len < -1 || len > MAX_BULK_LEN {
        return Err(ParseError::InvalidBulkLen);
    }

    let len = len as usize;
    let total = header_len + len + 2;
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header_len + len..total] != b"\r\n" {
        return Err(ParseError::InvalidBulkLen);
    }

    let data = buf[header_len..header_len + len].to_vec();
    Ok(Some((Frame::Bulk(Some(data)), total)))
}

fn parse_array(
    buf: &[u8],
    depth: usize,
) -> Result<Option<(Frame, usize)>, ParseError> {
    let Some((count, mut pos)) = parse_integer_line(buf, 1)? else {
        return Ok(None);
    };

    if count == -1 {
        return Ok(Some((Frame::Array(None), pos)));
    }
    if count < -1 || count > (1 << 20) {
        return Err(ParseError::InvalidMultibulkLen);
    }

    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match parse_frame(&buf[pos..], depth + 1)? {
            None => return Ok(None),
            Some((frame, consumed)) => {
                items.push(frame);
                pos += consumed;
            }
        }
    }

    Ok(Some((Frame::Array(Some(items)), pos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_string() {
        let mut p = Parser::new();
        p.feed(b"+OK\r\n");
        assert_eq!(p.next_frame().unwrap(), Some(Frame::Simple(b"OK".to_vec())));
    }

    #[test]
    fn parses_null_bulk_and_array() {
        let mut p = Parser::new();
        p.feed(b"$-1\r\n*-1\r\n");
        assert_eq!(p.next_frame().unwrap(), Some(Frame::Bulk(None)));
        assert_eq!(p.next_frame().unwrap(), Some(Frame::Array(None)));
    }

    #[test]
    fn tolerates_partial_input() {
        let mut p = Parser::new();
        p.feed(b"$5\r\nhel");
        assert_eq!(p.next_frame().unwrap(), None);
        p.feed(b"lo\r\n");
        assert_eq!(
            p.next_frame().unwrap(),
            Some(Frame::Bulk(Some(b"hello".to_vec())))
        );
    }

    #[test]
    fn parses_command_array() {
        let mut p = Parser::new();
        p.feed(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
        let cmd = p.next_command().unwrap().unwrap();
        assert_eq!(cmd, vec![b"GET".to_vec(), b"foo".to_vec()]);
    }

    #[test]
    fn parses_inline_command() {
        let mut p = Parser::new();
        p.feed(b"SET foo bar\r\n");
        let cmd = p.next_command().unwrap().unwrap();
        assert_eq!(cmd, vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()]);
    }

    #[test]
    fn inline_command_respects_quotes() {
        let mut p = Parser::new();
        p.feed(b"SET foo \"hello world\"\r\n");
        let cmd = p.next_command().unwrap().unwrap();
        assert_eq!(cmd, vec![b"SET".to_vec(), b"foo".to_vec(), b"hello world".to_vec()]);
    }

    #[test]
    fn nested_arrays_parse() {
        let mut p = Parser::new();
        p.feed(b"*1\r\n*1\r\n:1\r\n");
        let frame = p.next_frame().unwrap().unwrap();
        assert_eq!(
            frame,
            Frame::Array(Some(vec![Frame::Array(Some(vec![Frame::Integer(1)]))]))
        );
    }

    #[test]
    fn rejects_unknown_type_byte() {
        let mut p = Parser::new();
        p.feed(b"%1\r\n");
        assert!(p.next_frame().is_err());
    }

    #[test]
    fn leaves_trailing_bytes_buffered() {
        let mut p = Parser::new();
        p.feed(b"+OK\r\n+PONG\r\n+EXTR");
        assert_eq!(p.next_frame().unwrap(), Some(Frame::Simple(b"OK".to_vec())));
        assert_eq!(p.next_frame().unwrap(), Some(Frame::Simple(b"PONG".to_vec())));
        assert_eq!(p.next_frame().unwrap(), None);
        assert!(!p.is_empty());
    }
}
