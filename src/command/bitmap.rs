//! Bitmap commands (§4.5): bit-level access and whole-string boolean
//! algebra over the same byte string a `GET`/`SET` key holds, plus
//! `BITFIELD`'s packed sub-fields (§4.5 supplement).

use crate::{
    database::{
        bitmap::{self, BitOpKind, FieldType},
        Db, Value,
    },
    error::CommandError,
    resp::Frame,
};

use super::{parse_bit_offset, parse_bit_value, parse_i64};

fn str_bytes<'a>(
    db: &'a mut Db,
    key: &[u8],
) -> Result<&'a [u8], CommandError> {
    match db.get(key) {
        Some(Value::Str(s)) => Ok(s),
        Some(_) => Err(CommandError::WrongType),
        None => Ok(&[]),
    }
}

pub fn getbit(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let offset = parse_bit_offset(&args[1])?;
    let bytes = match db.get(&args[0]) {
        Some(Value::Str(s)) => s.as_slice(),
        Some(_) => return Err(CommandError::WrongType),
        None => &[][..],
    };
    Ok(Frame::Integer(bitmap::get_bit(bytes, offset) as i64))
}

pub fn setbit(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let offset = parse_bit_offset(&args[1])?;
    let bit = parse_bit_value(&args[2])?;

    match db.get_mut(&args[0]) {
        Some(Value::Str(s)) => Ok(Frame::Integer(bitmap::set_bit(s, offset, bit) as i64)),
        Some(_) => Err(CommandError::WrongType),
        None => {
            let mut bytes = Vec::new();
            let old = bitmap::set_bit(&mut bytes, offset, bit);
            db.set_keep_ttl(args[0].clone(), Value::Str(bytes));
            Ok(Frame::Integer(old as i64))
        }
    }
}

pub fn bitop(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let op = match args[0].to_ascii_uppercase().as_slice() {
        b"AND" => BitOpKind::And,
        b"OR" => BitOpKind::Or,
        b"XOR" => BitOpKind::Xor,
        b"NOT" => BitOpKind::Not,
        _ => return Err(CommandError::Syntax),
    };
    let dest = args[1].clone();
    let source_keys = &args[2..];

    if op == BitOpKind::Not && source_keys.len() != 1 {
        return Err(CommandError::Syntax);
    }

    let mut sources: Vec<Vec<u8>> = Vec::with_capacity(source_keys.len());
    for key in source_keys {
        sources.push(str_bytes(db, key)?.to_vec());
    }
    let refs: Vec<&[u8]> = sources.iter().map(|v| v.as_slice()).collect();

    let result = bitmap::bitop(op, &refs);
    let len = result.len() as i64;
    if result.is_empty() {
        db.remove(&dest);
    } else {
        db.set_keep_ttl(dest, Value::Str(result));
    }
    Ok(Frame::Integer(len))
}

pub fn bitcount(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let bytes = str_bytes(db, &args[0])?;

    let (start, end) = match args.len() {
        1 => (None, None),
        3 => (
            Some(parse_i64(&args[1])?),
            Some(parse_i64(&args[2])?),
        ),
        _ => return Err(CommandError::Syntax),
    };

    Ok(Frame::Integer(bitmap::bitcount_range(bytes, start, end)))
}

pub fn bitpos(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let bit = parse_bit_value(&args[1])?;
    let bytes = str_bytes(db, &args[0])?;

    let (start, end) = match args.len() {
        2 => (None, None),
        3 => (Some(parse_i64(&args[2])?), None),
        4 => (Some(parse_i64(&args[2])?), Some(parse_i64(&args[3])?)),
        _ => return Err(CommandError::Syntax),
    };

    Ok(Frame::Integer(bitmap::bitpos(bytes, bit, start, end)))
}

enum FieldOp {
    Get { ty: FieldType, offset: usize },
    Set { ty: FieldType, offset: usize, value: i64 },
    IncrBy { ty: FieldType, offset: usize, increment: i64 },
}

fn parse_bitfield_ops(args: &[Vec<u8>]) -> Result<Vec<FieldOp>, CommandError> {
    let mut ops = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let token = args[i].to_ascii_uppercase();
        match token.as_slice() {
            b"GET" => {
                let ty_str = std::str::from_utf8(args.get(i + 1).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let ty = FieldType::parse(ty_str).ok_or(CommandError::Syntax)?;
                let offset_str = std::str::from_utf8(args.get(i + 2).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let offset = bitmap::resolve_bitfield_offset(offset_str, ty.bits)
                    .ok_or(CommandError::BitOffsetOutOfRange)?;
                ops.push(FieldOp::Get { ty, offset });
                i += 3;
            }
            b"SET" => {
                let ty_str = std::str::from_utf8(args.get(i + 1).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let ty = FieldType::parse(ty_str).ok_or(CommandError::Syntax)?;
                let offset_str = std::str::from_utf8(args.get(i + 2).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let offset = bitmap::resolve_bitfield_offset(offset_str, ty.bits)
                    .ok_or(CommandError::BitOffsetOutOfRange)?;
                let value = parse_i64(args.get(i + 3).ok_or(CommandError::Syntax)?)?;
                ops.push(FieldOp::Set { ty, offset, value });
                i += 4;
            }
            b"INCRBY" => {
                let ty_str = std::str::from_utf8(args.get(i + 1).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let ty = FieldType::parse(ty_str).ok_or(CommandError::Syntax)?;
                let offset_str = std::str::from_utf8(args.get(i + 2).ok_or(CommandError::Syntax)?)
                    .map_err(|_| CommandError::Syntax)?;
                let offset = bitmap::resolve_bitfield_offset(offset_str, ty.bits)
                    .ok_or(CommandError::BitOffsetOutOfRange)?;
                let increment = parse_i64(args.get(i + 3).ok_or(CommandError::Syntax)?)?;
                ops.push(FieldOp::IncrBy { ty, offset, increment });
                i += 4;
            }
            _ => return Err(CommandError::Syntax),
        }
    }
    Ok(ops)
}

pub fn bitfield(
    db: &mut Db,
    args: &[Vec<u8>],
) -> Result<Frame, CommandError> {
    let key = args[0].clone();
    let ops = parse_bitfield_ops(&args[1..])?;

    let mut bytes = match db.get(&key) {
        Some(Value::Str(s)) => s.clone(),
        Some(_) => return Err(CommandError::WrongType),
        None => Vec::new(),
    };

    let mut replies = Vec::with_capacity(ops.len());
    for op in ops {
        let value = match op {
            FieldOp::Get { ty, offset } => bitmap::bitfield_get(&bytes, ty, offset),
            FieldOp::Set { ty, offset, value } => bitmap::bitfield_set(&mut bytes, ty, offset, value),
            FieldOp::IncrBy { ty, offset, increment } => {
                bitmap::bitfield_incrby(&mut bytes, ty, offset, increment)
            }
        };
        replies.push(Frame::Integer(value));
    }

    db.set_keep_ttl(key, Value::Str(bytes));
    Ok(Frame::array(replies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn db() -> Db {
        let mut d = Db::new(256);
        d.hash_key = SipHashKey::from_bytes([3; 16]);
        d
    }

    fn a(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn setbit_then_getbit() {
        let mut d = db();
        assert_eq!(setbit(&mut d, &a(&["k", "7", "1"])).unwrap(), Frame::Integer(0));
        assert_eq!(getbit(&mut d, &a(&["k", "7"])).unwrap(), Frame::Integer(1));
    }

    #[test]
    fn bitcount_whole_string() {
        let mut d = db();
        setbit(&mut d, &a(&["k", "0", "1"])).unwrap();
        setbit(&mut d, &a(&["k", "1", "1"])).unwrap();
        assert_eq!(bitcount(&mut d, &a(&["k"])).unwrap(), Frame::Integer(2));
    }

    #[test]
    fn bitop_and_writes_dest() {
        let mut d = db();
        setbit(&mut d, &a(&["a", "0", "1"])).unwrap();
        setbit(&mut d, &a(&["b", "0", "1"])).unwrap();
        bitop(&mut d, &a(&["AND", "dest", "a", "b"])).unwrap();
        assert_eq!(getbit(&mut d, &a(&["dest", "0"])).unwrap(), Frame::Integer(1));
    }

    #[test]
    fn bitfield_set_and_get() {
        let mut d = db();
        let reply = bitfield(&mut d, &a(&["k", "SET", "u8", "0", "200", "GET", "u8", "0"])).unwrap();
        match reply {
            Frame::Array(Some(items)) => {
                assert_eq!(items[0], Frame::Integer(0));
                assert_eq!(items[1], Frame::Integer(200));
            }
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn bitpos_first_set_bit() {
        let mut d = db();
        setbit(&mut d, &a(&["k", "5", "1"])).unwrap();
        assert_eq!(bitpos(&mut d, &a(&["k", "1"])).unwrap(), Frame::Integer(5));
    }
}
