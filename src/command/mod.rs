//! Command surface (§4.9, §9 "polymorphic command dispatch"): a static
//! table of `(name, arity, handler)` replaces the source's class-based
//! dispatch. Each handler takes the keyspace plus the command's own
//! arguments (the command name itself is stripped before the handler
//! runs) and returns a RESP frame or a typed [`CommandError`] (§7), which
//! the dispatcher — the only place that knows about the wire format at
//! this layer — turns into an `Error` frame.

mod bitmap;
mod hash;
mod keyspace;
mod set;
mod string;

use crate::{database::Db, error::CommandError, resp::Frame};

/// One entry in the dispatch table. `arity` follows the Redis convention:
/// non-negative means exactly that many arguments (command name included),
/// negative means "at least `|arity|`" (§4.9).
struct CommandSpec {
    name: &'static str,
    arity: i32,
    handler: fn(&mut Db, &[Vec<u8>]) -> Result<Frame, CommandError>,
}

macro_rules! spec {
    ($name:literal, $arity:expr, $handler:path) => {
        CommandSpec {
            name: $name,
            arity: $arity,
            handler: $handler,
        }
    };
}

static COMMANDS: &[CommandSpec] = &[
    // Strings / keyspace (§4.9 supplement)
    spec!("GET", 2, string::get),
    spec!("SET", -3, string::set),
    spec!("SETNX", 3, string::setnx),
    spec!("APPEND", 3, string::append),
    spec!("STRLEN", 2, string::strlen),
    spec!("TTL", 2, keyspace::ttl),
    spec!("PTTL", 2, keyspace::pttl),
    spec!("EXPIRE", 3, keyspace::expire),
    spec!("PEXPIRE", 3, keyspace::pexpire),
    spec!("PERSIST", 2, keyspace::persist),
    spec!("DEL", -2, keyspace::del),
    spec!("EXISTS", -2, keyspace::exists),
    spec!("TYPE", 2, keyspace::type_cmd),
    spec!("KEYS", 2, keyspace::keys),
    spec!("FLUSHALL", 1, keyspace::flushall),
    spec!("PING", -1, keyspace::ping),
    spec!("ECHO", 2, keyspace::echo),
    spec!("COMMAND", -1, keyspace::command_stub),
    // Bitmaps (§4.5)
    spec!("GETBIT", 3, bitmap::getbit),
    spec!("SETBIT", 4, bitmap::setbit),
    spec!("BITOP", -4, bitmap::bitop),
    spec!("BITCOUNT", -2, bitmap::bitcount),
    spec!("BITPOS", -3, bitmap::bitpos),
    spec!("BITFIELD", -2, bitmap::bitfield),
    // Hashes (§4.9, "Hash value")
    spec!("HSET", -4, hash::hset),
    spec!("HGET", 3, hash::hget),
    spec!("HGETALL", 2, hash::hgetall),
    spec!("HDEL", -3, hash::hdel),
    spec!("HEXISTS", 3, hash::hexists),
    spec!("HINCRBY", 4, hash::hincrby),
    spec!("HINCRBYFLOAT", 4, hash::hincrbyfloat),
    spec!("HKEYS", 2, hash::hkeys),
    spec!("HVALS", 2, hash::hvals),
    spec!("HLEN", 2, hash::hlen),
    spec!("HMGET", -3, hash::hmget),
    spec!("HSETNX", 4, hash::hsetnx),
    spec!("HSTRLEN", 3, hash::hstrlen),
    // Sets (§4.4)
    spec!("SADD", -3, set::sadd),
    spec!("SREM", -3, set::srem),
    spec!("SISMEMBER", 3, set::sismember),
    spec!("SMEMBERS", 2, set::smembers),
    spec!("SCARD", 2, set::scard),
    spec!("SPOP", -2, set::spop),
    spec!("SRANDMEMBER", -2, set::srandmember),
    spec!("SINTER", -2, set::sinter),
    spec!("SUNION", -2, set::sunion),
    spec!("SDIFF", -2, set::sdiff),
];

fn find_command(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

fn arity_satisfied(
    spec: &CommandSpec,
    provided: usize,
) -> bool {
    if spec.arity >= 0 {
        provided == spec.arity as usize
    } else {
        provided >= spec.arity.unsigned_abs() as usize
    }
}

/// Dispatches one already-parsed command frame against `db`, producing
/// the reply frame to write back to the client. Never panics on
/// malformed-but-well-typed input — all failure paths return an Error
/// frame (§7).
pub fn dispatch(
    db: &mut Db,
    raw_args: &[Vec<u8>],
) -> Frame {
    let Some(name_bytes) = raw_args.first() else {
        return CommandError::Other("empty command".into()).to_frame();
    };
    let name = String::from_utf8_lossy(name_bytes).to_string();

    let Some(command) = find_command(&name) else {
        return CommandError::UnknownCommand(name).to_frame();
    };

    if !arity_satisfied(command, raw_args.len()) {
        return CommandError::Arity(name).to_frame();
    }

    match (command.handler)(db, &raw_args[1..]) {
        Ok(frame) => frame,
        Err(e) => e.to_frame(),
    }
}

// ---------------------------------------------------------------------
// Shared argument-parsing helpers used across command handlers.
// ---------------------------------------------------------------------

pub(crate) fn parse_i64(bytes: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::NotAnInteger)
}

pub(crate) fn parse_f64(bytes: &[u8]) -> Result<f64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or(CommandError::NotAFloat)
}

pub(crate) fn parse_bit_offset(bytes: &[u8]) -> Result<usize, CommandError> {
    let n = std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CommandError::BitOffsetOutOfRange)?;
    if n < 0 {
        return Err(CommandError::BitOffsetOutOfRange);
    }
    Ok(n as usize)
}

pub(crate) fn parse_bit_value(bytes: &[u8]) -> Result<u8, CommandError> {
    match bytes {
        b"0" => Ok(0),
        b"1" => Ok(1),
        _ => Err(CommandError::BitNotAnInteger),
    }
}

pub(crate) fn bulk_array(items: Vec<Vec<u8>>) -> Frame {
    Frame::array(items.into_iter().map(Frame::bulk).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([4; 16]);
        d
    }

    fn args(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn scenario_set_get_missing() {
        let mut d = db();
        assert_eq!(dispatch(&mut d, &args(&["SET", "foo", "bar"])), Frame::ok());
        assert_eq!(
            dispatch(&mut d, &args(&["GET", "foo"])),
            Frame::bulk("bar")
        );
        assert_eq!(dispatch(&mut d, &args(&["GET", "missing"])), Frame::null_bulk());
    }

    #[test]
    fn unknown_command_is_an_error_frame() {
        let mut d = db();
        let reply = dispatch(&mut d, &args(&["NOTACOMMAND", "x"]));
        match reply {
            Frame::Error(msg) => assert!(String::from_utf8_lossy(&msg).contains("unknown command")),
            _ => panic!("expected error frame"),
        }
    }

    #[test]
    fn wrong_arity_is_an_error_frame() {
        let mut d = db();
        let reply = dispatch(&mut d, &args(&["GET"]));
        match reply {
            Frame::Error(msg) => assert!(String::from_utf8_lossy(&msg).contains("wrong number")),
            _ => panic!("expected error frame"),
        }
    }

    #[test]
    fn scenario_setbit_getbit() {
        let mut d = db();
        assert_eq!(dispatch(&mut d, &args(&["SETBIT", "k", "7", "1"])), Frame::Integer(0));
        assert_eq!(dispatch(&mut d, &args(&["GETBIT", "k", "7"])), Frame::Integer(1));
        assert_eq!(dispatch(&mut d, &args(&["GETBIT", "k", "0"])), Frame::Integer(0));
    }

    #[test]
    fn scenario_hset_hgetall_pair_order() {
        let mut d = db();
        assert_eq!(
            dispatch(&mut d, &args(&["HSET", "h", "f1", "v1", "f2", "v2"])),
            Frame::Integer(2)
        );
        let reply = dispatch(&mut d, &args(&["HGETALL", "h"]));
        match reply {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 4),
            _ => panic!("expected array"),
        }
    }
}
