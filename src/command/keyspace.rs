//! Generic keyspace commands (§3 supplement): TTL lifecycle, existence,
//! deletion, introspection. These are thin leaves over [`Db`] and
//! [`ExpireIndex`](crate::database::ExpireIndex) — no new invariants
//! beyond what §3/§4.7 already specify.

use globset::Glob;

use super::bulk_array;
use crate::{
    database::{expire::ExpireIndex, Db},
    error::CommandError,
    resp::Frame,
};

pub fn ttl(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    if !db.contains_key(&args[0]) {
        return Ok(Frame::Integer(-2));
    }
    match db.ttl_ms(&args[0]) {
        Some(ms) => Ok(Frame::Integer(ms.div_euclid(1000).max(0) + i64::from(ms % 1000 != 0))),
        None => Ok(Frame::Integer(-1)),
    }
}

pub fn pttl(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    if !db.contains_key(&args[0]) {
        return Ok(Frame::Integer(-2));
    }
    match db.ttl_ms(&args[0]) {
        Some(ms) => Ok(Frame::Integer(ms)),
        None => Ok(Frame::Integer(-1)),
    }
}

pub fn expire(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let seconds = super::parse_i64(&args[1])?;
    if !db.contains_key(&args[0]) {
        return Ok(Frame::Integer(0));
    }
    db.set_expiry(&args[0], ExpireIndex::now_ms() + seconds * 1000);
    Ok(Frame::Integer(1))
}

pub fn pexpire(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let ms = super::parse_i64(&args[1])?;
    if !db.contains_key(&args[0]) {
        return Ok(Frame::Integer(0));
    }
    db.set_expiry(&args[0], ExpireIndex::now_ms() + ms);
    Ok(Frame::Integer(1))
}

pub fn persist(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    if !db.contains_key(&args[0]) {
        return Ok(Frame::Integer(0));
    }
    Ok(Frame::Integer(db.persist(&args[0]) as i64))
}

pub fn del(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let mut count = 0i64;
    for key in args {
        if db.remove(key) {
            count += 1;
        }
    }
    Ok(Frame::Integer(count))
}

pub fn exists(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let mut count = 0i64;
    for key in args {
        if db.contains_key(key) {
            count += 1;
        }
    }
    Ok(Frame::Integer(count))
}

pub fn type_cmd(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get(&args[0]) {
        Some(v) => Ok(Frame::simple(v.type_name())),
        None => Ok(Frame::simple("none")),
    }
}

pub fn keys(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let pattern = std::str::from_utf8(&args[0]).map_err(|_| CommandError::Syntax)?;
    let glob = Glob::new(pattern)
        .map_err(|_| CommandError::Syntax)?
        .compile_matcher();

    let mut matched = Vec::new();
    for (key, _) in db.keyspace.iter() {
        if glob.is_match(String::from_utf8_lossy(key).as_ref()) {
            matched.push(key.clone());
        }
    }
    Ok(bulk_array(matched))
}

pub fn flushall(
    db: &mut Db,
    _args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    db.flush_all();
    Ok(Frame::ok())
}

pub fn ping(
    _db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match args.first() {
        Some(msg) => Ok(Frame::bulk(msg.clone())),
        None => Ok(Frame::simple("PONG")),
    }
}

pub fn echo(
    _db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    Ok(Frame::bulk(args[0].clone()))
}

/// Arity-only stub: enough for clients that probe `COMMAND` before
/// sending real traffic. No command introspection payload is modeled.
pub fn command_stub(
    _db: &mut Db,
    _args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    Ok(Frame::array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([2; 16]);
        d
    }

    #[test]
    fn ttl_missing_key_is_minus_two() {
        let mut d = db();
        assert_eq!(ttl(&mut d, &[b"nope".to_vec()]).unwrap(), Frame::Integer(-2));
    }

    #[test]
    fn ttl_no_expiry_is_minus_one() {
        let mut d = db();
        d.set(b"k".to_vec(), crate::database::Value::Str(b"v".to_vec()));
        assert_eq!(ttl(&mut d, &[b"k".to_vec()]).unwrap(), Frame::Integer(-1));
    }

    #[test]
    fn expire_then_persist_clears_ttl() {
        let mut d = db();
        d.set(b"k".to_vec(), crate::database::Value::Str(b"v".to_vec()));
        expire(&mut d, &[b"k".to_vec(), b"100".to_vec()]).unwrap();
        assert_ne!(ttl(&mut d, &[b"k".to_vec()]).unwrap(), Frame::Integer(-1));
        persist(&mut d, &[b"k".to_vec()]).unwrap();
        assert_eq!(ttl(&mut d, &[b"k".to_vec()]).unwrap(), Frame::Integer(-1));
    }

    #[test]
    fn del_counts_removed_keys() {
        let mut d = db();
        d.set(b"a".to_vec(), crate::database::Value::Str(b"1".to_vec()));
        let n = del(&mut d, &[b"a".to_vec(), b"b".to_vec()]).unwrap();
        assert_eq!(n, Frame::Integer(1));
    }

    #[test]
    fn keys_glob_matches() {
        let mut d = db();
        d.set(b"foo1".to_vec(), crate::database::Value::Str(b"x".to_vec()));
        d.set(b"bar1".to_vec(), crate::database::Value::Str(b"x".to_vec()));
        let reply = keys(&mut d, &[b"foo*".to_vec()]).unwrap();
        match reply {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
    }
}
