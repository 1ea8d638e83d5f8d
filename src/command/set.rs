//! Set commands (§4.4): member mutation, membership tests, and the set
//! algebra (`SINTER`/`SUNION`/`SDIFF`) built on the adaptive
//! `SetValue`'s module-level `intersect`/`union`/`difference` helpers.

use crate::{
    database::{set, Db, SetValue, Value},
    error::CommandError,
    resp::Frame,
};

use super::{bulk_array, parse_i64};

fn set_ref<'a>(
    db: &'a mut Db,
    key: &[u8],
) -> Result<Option<&'a SetValue>, CommandError> {
    match db.get(key) {
        Some(Value::Set(s)) => Ok(Some(s)),
        Some(_) => Err(CommandError::WrongType),
        None => Ok(None),
    }
}

pub fn sadd(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let key = args[0].clone();
    let max_list_size = db.max_list_size;
    let hash_key = db.hash_key.clone();

    if db.get(&key).is_some() {
        match db.get_mut(&key) {
            Some(Value::Set(s)) => {
                let mut added = 0i64;
                for member in &args[1..] {
                    if s.add(member.clone(), max_list_size, &hash_key) {
                        added += 1;
                    }
                }
                return Ok(Frame::Integer(added));
            }
            Some(_) => return Err(CommandError::WrongType),
            None => unreachable!(),
        }
    }

    let mut fresh = SetValue::new();
    let mut added = 0i64;
    for member in &args[1..] {
        if fresh.add(member.clone(), max_list_size, &hash_key) {
            added += 1;
        }
    }
    db.set_keep_ttl(key, Value::Set(fresh));
    Ok(Frame::Integer(added))
}

pub fn srem(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get_mut(&args[0]) {
        Some(Value::Set(s)) => {
            let mut removed = 0i64;
            for member in &args[1..] {
                if s.remove(member) {
                    removed += 1;
                }
            }
            Ok(Frame::Integer(removed))
        }
        Some(_) => Err(CommandError::WrongType),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn sismember(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match set_ref(db, &args[0])? {
        Some(s) => Ok(Frame::Integer(s.contains(&args[1]) as i64)),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn smembers(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match set_ref(db, &args[0])? {
        Some(s) => Ok(bulk_array(s.members())),
        None => Ok(bulk_array(Vec::new())),
    }
}

pub fn scard(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match set_ref(db, &args[0])? {
        Some(s) => Ok(Frame::Integer(s.cardinality() as i64)),
        None => Ok(Frame::Integer(0)),
    }
}

pub fn spop(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let count = match args.len() {
        1 => None,
        2 => Some(parse_i64(&args[1])?),
        _ => return Err(CommandError::Syntax),
    };

    match db.get_mut(&args[0]) {
        Some(Value::Set(s)) => match count {
            None => Ok(match s.pop() {
                Some(m) => Frame::bulk(m),
                None => Frame::null_bulk(),
            }),
            Some(n) if n < 0 => Err(CommandError::Other("value is out of range, must be positive".into())),
            Some(n) => Ok(bulk_array(s.pop_with_count(n as usize))),
        },
        Some(_) => Err(CommandError::WrongType),
        None => Ok(match count {
            None => Frame::null_bulk(),
            Some(_) => bulk_array(Vec::new()),
        }),
    }
}

pub fn srandmember(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let count = match args.len() {
        1 => None,
        2 => Some(parse_i64(&args[1])?),
        _ => return Err(CommandError::Syntax),
    };

    let found = set_ref(db, &args[0])?;
    match (found, count) {
        (Some(s), None) => Ok(match s.random_member() {
            Some(m) => Frame::bulk(m),
            None => Frame::null_bulk(),
        }),
        (Some(s), Some(n)) => Ok(bulk_array(s.random_members_with_count(n))),
        (None, None) => Ok(Frame::null_bulk()),
        (None, Some(_)) => Ok(bulk_array(Vec::new())),
    }
}

fn gather_sets<'a>(
    db: &'a mut Db,
    keys: &[Vec<u8>],
) -> Result<Vec<Option<&'a SetValue>>, CommandError> {
    // Each key is looked up independently; `Db::get` takes `&mut self` for
    // lazy expiry, so keys are resolved one at a time into an index list
    // before re-borrowing immutably for the algebra helpers below.
    let mut result = Vec::with_capacity(keys.len());
    for key in keys {
        result.push(set_ref(db, key)?);
    }
    Ok(result)
}

pub fn sinter(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let found = gather_sets(db, args)?;
    if found.iter().any(Option::is_none) {
        return Ok(bulk_array(Vec::new()));
    }
    let sets: Vec<&SetValue> = found.into_iter().map(Option::unwrap).collect();
    Ok(bulk_array(set::intersect(&sets).members()))
}

pub fn sunion(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let found = gather_sets(db, args)?;
    let empty = SetValue::new();
    let sets: Vec<&SetValue> = found.iter().map(|o| o.unwrap_or(&empty)).collect();
    Ok(bulk_array(set::union(&sets).members()))
}

pub fn sdiff(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let found = gather_sets(db, args)?;
    let empty = SetValue::new();
    let sets: Vec<&SetValue> = found.iter().map(|o| o.unwrap_or(&empty)).collect();
    Ok(bulk_array(set::difference(&sets).members()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([7; 16]);
        d
    }

    fn a(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn sadd_counts_new_members_only() {
        let mut d = db();
        assert_eq!(sadd(&mut d, &a(&["s", "1", "2", "3"])).unwrap(), Frame::Integer(3));
        assert_eq!(sadd(&mut d, &a(&["s", "3", "4"])).unwrap(), Frame::Integer(1));
    }

    #[test]
    fn sismember_reflects_membership() {
        let mut d = db();
        sadd(&mut d, &a(&["s", "x"])).unwrap();
        assert_eq!(sismember(&mut d, &a(&["s", "x"])).unwrap(), Frame::Integer(1));
        assert_eq!(sismember(&mut d, &a(&["s", "y"])).unwrap(), Frame::Integer(0));
    }

    #[test]
    fn sinter_short_circuits_on_missing_key() {
        let mut d = db();
        sadd(&mut d, &a(&["a", "1", "2"])).unwrap();
        let reply = sinter(&mut d, &a(&["a", "missing"])).unwrap();
        match reply {
            Frame::Array(Some(items)) => assert!(items.is_empty()),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn sunion_treats_missing_key_as_empty() {
        let mut d = db();
        sadd(&mut d, &a(&["a", "1"])).unwrap();
        let reply = sunion(&mut d, &a(&["a", "missing"])).unwrap();
        match reply {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 1),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn spop_with_count_removes_up_to_n() {
        let mut d = db();
        sadd(&mut d, &a(&["s", "1", "2", "3"])).unwrap();
        let reply = spop(&mut d, &a(&["s", "2"])).unwrap();
        match reply {
            Frame::Array(Some(items)) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
        assert_eq!(scard(&mut d, &a(&["s"])).unwrap(), Frame::Integer(1));
    }
}
