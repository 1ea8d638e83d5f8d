//! Hash commands (§3, "Hash value"): field/value access over a
//! `Value::Hash(Dict<Vec<u8>, Vec<u8>>)`, following the same
//! lazily-create-on-write convention as strings and sets.

use crate::{
    database::{dict::Entry, Db, Value},
    error::CommandError,
    resp::Frame,
};

use super::{bulk_array, parse_f64, parse_i64};

fn hash_ref<'a>(
    db: &'a mut Db,
    key: &[u8],
) -> Result<Option<&'a crate::database::Dict<Vec<u8>, Vec<u8>>>, CommandError> {
    match db.get(key) {
        Some(Value::Hash(h)) => Ok(Some(h)),
        Some(_) => Err(CommandError::WrongType),
        None => Ok(None),
    }
}

fn hash_mut_or_create<'a>(
    db: &'a mut Db,
    key: &[u8],
) -> Result<&'a mut crate::database::Dict<Vec<u8>, Vec<u8>>, CommandError> {
    if db.get(key).is_some() {
        match db.get_mut(key) {
            Some(Value::Hash(h)) => return Ok(h),
            Some(_) => return Err(CommandError::WrongType),
            None => unreachable!(),
        }
    }
    db.set_keep_ttl(key.to_vec(), Value::Hash(crate::database::Dict::with_hash_key(db.hash_key.clone())));
    match db.get_mut(key) {
        Some(Value::Hash(h)) => Ok(h),
        _ => unreachable!("just inserted"),
    }
}

pub fn hset(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let key = args[0].clone();
    if (args.len() - 1) % 2 != 0 {
        return Err(CommandError::Syntax);
    }
    let hash = hash_mut_or_create(db, &key)?;

    let mut added = 0i64;
    for pair in args[1..].chunks(2) {
        if hash.insert(pair[0].clone(), pair[1].clone()) {
            added += 1;
        }
    }
    Ok(Frame::Integer(added))
}

pub fn hsetnx(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let key = args[0].clone();
    let hash = hash_mut_or_create(db, &key)?;
    if hash.contains_key(&args[1]) {
        return Ok(Frame::Integer(0));
    }
    hash.insert(args[1].clone(), args[2].clone());
    Ok(Frame::Integer(1))
}

pub fn hget(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match hash_ref(db, &args[0])? {
        Some(h) => match h.get(&args[1]) {
            Some(v) => Ok(Frame::bulk(v.clone())),
            None => Ok(Frame::null_bulk()),
        },
        None => Ok(Frame::null_bulk()),
    }
}

pub fn hmget(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let fields = &args[1..];
    let hash = hash_ref(db, &args[0])?;
    let replies = fields
        .iter()
        .map(|f| match hash.and_then(|h| h.get(f)) {
            Some(v) => Frame::bulk(v.clone()),
            None => Frame::null_bulk(),
        })
        .collect();
    Ok(Frame::array(replies))
}

pub fn hgetall(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let mut flat = Vec::new();
    if let Some(h) = hash_ref(db, &args[0])? {
        for (k, v) in h.iter() {
            flat.push(k.clone());
            flat.push(v.clone());
        }
    }
    Ok(bulk_array(flat))
}

pub fn hdel(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get_mut(&args[0]) {
        Some(Value::Hash(h)) => {
            let mut removed = 0i64;
            for field in &args[1..] {
                if h.remove(field) {
                    removed += 1;
                }
            }
            Ok(Frame::Integer(removed))
        }
        Some(_) => Err(CommandError::WrongType),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn hexists(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match hash_ref(db, &args[0])? {
        Some(h) => Ok(Frame::Integer(h.contains_key(&args[1]) as i64)),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn hkeys(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let mut keys = Vec::new();
    if let Some(h) = hash_ref(db, &args[0])? {
        keys.extend(h.iter().map(|(k, _)| k.clone()));
    }
    Ok(bulk_array(keys))
}

pub fn hvals(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let mut vals = Vec::new();
    if let Some(h) = hash_ref(db, &args[0])? {
        vals.extend(h.iter().map(|(_, v)| v.clone()));
    }
    Ok(bulk_array(vals))
}

pub fn hlen(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match hash_ref(db, &args[0])? {
        Some(h) => Ok(Frame::Integer(h.len() as i64)),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn hstrlen(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match hash_ref(db, &args[0])? {
        Some(h) => Ok(Frame::Integer(h.get(&args[1]).map_or(0, |v| v.len() as i64))),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn hincrby(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let increment = parse_i64(&args[2])?;
    let key = args[0].clone();
    let hash = hash_mut_or_create(db, &key)?;

    let current = match hash.entry(args[1].clone()) {
        Entry::Occupied(e) => {
            let n = std::str::from_utf8(e.get())
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandError::HashValueNotAnInteger)?;
            n
        }
        Entry::Vacant(_) => 0,
    };

    let next = current
        .checked_add(increment)
        .ok_or(CommandError::Overflow)?;
    hash.insert(args[1].clone(), next.to_string().into_bytes());
    Ok(Frame::Integer(next))
}

pub fn hincrbyfloat(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let increment = parse_f64(&args[2])?;
    let key = args[0].clone();
    let hash = hash_mut_or_create(db, &key)?;

    let current = match hash.get(&args[1]) {
        Some(v) => std::str::from_utf8(v)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(CommandError::NotAFloat)?,
        None => 0.0,
    };

    let next = current + increment;
    if !next.is_finite() {
        return Err(CommandError::NotFinite);
    }
    let rendered = format!("{next}");
    hash.insert(args[1].clone(), rendered.clone().into_bytes());
    Ok(Frame::bulk(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([6; 16]);
        d
    }

    fn a(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn hset_then_hget() {
        let mut d = db();
        assert_eq!(hset(&mut d, &a(&["h", "f", "v"])).unwrap(), Frame::Integer(1));
        assert_eq!(hget(&mut d, &a(&["h", "f"])).unwrap(), Frame::bulk("v"));
    }

    #[test]
    fn hset_overwrite_does_not_count_as_added() {
        let mut d = db();
        hset(&mut d, &a(&["h", "f", "v1"])).unwrap();
        assert_eq!(hset(&mut d, &a(&["h", "f", "v2"])).unwrap(), Frame::Integer(0));
        assert_eq!(hget(&mut d, &a(&["h", "f"])).unwrap(), Frame::bulk("v2"));
    }

    #[test]
    fn hdel_on_missing_key_is_zero() {
        let mut d = db();
        assert_eq!(hdel(&mut d, &a(&["missing", "f"])).unwrap(), Frame::Integer(0));
    }

    #[test]
    fn hincrby_creates_and_accumulates() {
        let mut d = db();
        assert_eq!(hincrby(&mut d, &a(&["h", "n", "5"])).unwrap(), Frame::Integer(5));
        assert_eq!(hincrby(&mut d, &a(&["h", "n", "-2"])).unwrap(), Frame::Integer(3));
    }

    #[test]
    fn hincrby_on_non_integer_errors() {
        let mut d = db();
        hset(&mut d, &a(&["h", "f", "notanumber"])).unwrap();
        assert_eq!(
            hincrby(&mut d, &a(&["h", "f", "1"])),
            Err(CommandError::HashValueNotAnInteger)
        );
    }

    #[test]
    fn hincrbyfloat_accumulates() {
        let mut d = db();
        hincrbyfloat(&mut d, &a(&["h", "f", "10.5"])).unwrap();
        assert_eq!(hincrbyfloat(&mut d, &a(&["h", "f", "0.1"])).unwrap(), Frame::bulk("10.6"));
    }

    #[test]
    fn hgetall_pairs_every_field() {
        let mut d = db();
        hset(&mut d, &a(&["h", "a", "1", "b", "2"])).unwrap();
        let reply = hgetall(&mut d, &a(&["h"])).unwrap();
        match reply {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 4),
            _ => panic!("expected array"),
        }
    }
}
