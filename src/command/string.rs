//! String commands (§4.9 supplement): `GET`/`SET` plus the small cluster
//! of string helpers (`SETNX`, `APPEND`, `STRLEN`) the distilled spec
//! names only in its literal scenarios (§8).

use crate::{
    database::{Db, Value},
    error::CommandError,
    resp::Frame,
};

pub fn get(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get(&args[0]) {
        Some(Value::Str(s)) => Ok(Frame::bulk(s.clone())),
        Some(_) => Err(CommandError::WrongType),
        None => Ok(Frame::null_bulk()),
    }
}

struct SetOptions {
    nx: bool,
    xx: bool,
    keep_ttl: bool,
    expire_ms: Option<i64>,
}

fn parse_set_options(args: &[Vec<u8>]) -> Result<SetOptions, CommandError> {
    let mut opts = SetOptions {
        nx: false,
        xx: false,
        keep_ttl: false,
        expire_ms: None,
    };

    let mut i = 0;
    while i < args.len() {
        let token = args[i].to_ascii_uppercase();
        match token.as_slice() {
            b"NX" => {
                opts.nx = true;
                i += 1;
            }
            b"XX" => {
                opts.xx = true;
                i += 1;
            }
            b"KEEPTTL" => {
                opts.keep_ttl = true;
                i += 1;
            }
            b"EX" => {
                let seconds = super::parse_i64(args.get(i + 1).ok_or(CommandError::Syntax)?)?;
                opts.expire_ms = Some(seconds * 1000);
                i += 2;
            }
            b"PX" => {
                let ms = super::parse_i64(args.get(i + 1).ok_or(CommandError::Syntax)?)?;
                opts.expire_ms = Some(ms);
                i += 2;
            }
            _ => return Err(CommandError::Syntax),
        }
    }

    if opts.nx && opts.xx {
        return Err(CommandError::Syntax);
    }
    if opts.keep_ttl && opts.expire_ms.is_some() {
        return Err(CommandError::Syntax);
    }

    Ok(opts)
}

pub fn set(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let key = &args[0];
    let value = args[1].clone();
    let opts = parse_set_options(&args[2..])?;

    let exists = db.contains_key(key);
    if opts.nx && exists {
        return Ok(Frame::null_bulk());
    }
    if opts.xx && !exists {
        return Ok(Frame::null_bulk());
    }

    if opts.keep_ttl {
        db.set_keep_ttl(key.clone(), Value::Str(value));
    } else {
        db.set(key.clone(), Value::Str(value));
    }

    if let Some(ms) = opts.expire_ms {
        db.set_expiry(key, crate::database::expire::ExpireIndex::now_ms() + ms);
    }

    Ok(Frame::ok())
}

pub fn setnx(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    if db.contains_key(&args[0]) {
        return Ok(Frame::Integer(0));
    }
    db.set(args[0].clone(), Value::Str(args[1].clone()));
    Ok(Frame::Integer(1))
}

pub fn append(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get_mut(&args[0]) {
        Some(Value::Str(s)) => {
            s.extend_from_slice(&args[1]);
            Ok(Frame::Integer(s.len() as i64))
        }
        Some(_) => Err(CommandError::WrongType),
        None => {
            let len = args[1].len();
            db.set_keep_ttl(args[0].clone(), Value::Str(args[1].clone()));
            Ok(Frame::Integer(len as i64))
        }
    }
}

pub fn strlen(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    match db.get(&args[0]) {
        Some(Value::Str(s)) => Ok(Frame::Integer(s.len() as i64)),
        Some(_) => Err(CommandError::WrongType),
        None => Ok(Frame::Integer(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([1; 16]);
        d
    }

    fn a(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut d = db();
        set(&mut d, &a(&["k", "v"])).unwrap();
        assert_eq!(get(&mut d, &a(&["k"])).unwrap(), Frame::bulk("v"));
    }

    #[test]
    fn set_nx_refuses_existing_key() {
        let mut d = db();
        set(&mut d, &a(&["k", "v1"])).unwrap();
        let reply = set(&mut d, &a(&["k", "v2", "NX"])).unwrap();
        assert_eq!(reply, Frame::null_bulk());
        assert_eq!(get(&mut d, &a(&["k"])).unwrap(), Frame::bulk("v1"));
    }

    #[test]
    fn set_xx_refuses_missing_key() {
        let mut d = db();
        let reply = set(&mut d, &a(&["missing", "v", "XX"])).unwrap();
        assert_eq!(reply, Frame::null_bulk());
    }

    #[test]
    fn set_ex_installs_ttl() {
        let mut d = db();
        set(&mut d, &a(&["k", "v", "EX", "100"])).unwrap();
        assert!(d.ttl_ms(b"k").is_some());
    }

    #[test]
    fn append_on_missing_key_creates_it() {
        let mut d = db();
        let n = append(&mut d, &a(&["k", "hello"])).unwrap();
        assert_eq!(n, Frame::Integer(5));
        let n2 = append(&mut d, &a(&["k", " world"])).unwrap();
        assert_eq!(n2, Frame::Integer(11));
        assert_eq!(get(&mut d, &a(&["k"])).unwrap(), Frame::bulk("hello world"));
    }

    #[test]
    fn strlen_on_missing_key_is_zero() {
        let mut d = db();
        assert_eq!(strlen(&mut d, &a(&["missing"])).unwrap(), Frame::Integer(0));
    }

    #[test]
    fn get_on_wrong_type_errors() {
        let mut d = db();
        d.set(b"k".to_vec(), Value::Set(crate::database::SetValue::new()));
        assert_eq!(get(&mut d, &a(&["k"])), Err(CommandError::WrongType));
    }
}
