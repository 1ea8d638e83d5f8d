//! Модуль `bitmap` предоставляет структуру `Bitmap` для
//! эффективной работы с битовыми массивами.
//!
//! Поддерживаются операции установки и получения битов по
//! индексу, подсчёта установленных битов в диапазоне и
//! побитовые логические операции (`AND`, `OR`, `XOR`, `NOT`)
//! между битовыми массивами.
//!
//! Используется, например, для реализации команд: `SETBIT`,
//! `GETBIT`, `BITCOUNT`, `BITOP` и др.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use serde::{Deserialize, Serialize};

/// Lookup-таблица для подсчёта количества установленных битов
/// в байтах от 0 до 255.
const BIT_COUNT_TABLE: [u8; 256] = [
    0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5, 2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5, 2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6, 3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    1, 2, 2, 3, 2, 3, 3, 4, 2, 3, 3, 4, 3, 4, 4, 5, 2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6, 3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    2, 3, 3, 4, 3, 4, 4, 5, 3, 4, 4, 5, 4, 5, 5, 6, 3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7,
    3, 4, 4, 5, 4, 5, 5, 6, 4, 5, 5, 6, 5, 6, 6, 7, 4, 5, 5, 6, 5, 6, 6, 7, 5, 6, 6, 7, 6, 7, 7, 8,
];

/// Структура `Bitmap` — представляет динамический битовый массив.
///
/// Используется для хранения и обработки битов с возможностью
/// побитовых операций и подсчёта.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub bytes: Vec<u8>,
}

impl Bitmap {
    /// Создаёт новый пустой `Bitmap` без заранее выделенной
    /// памяти.
    ///
    /// Массив автоматически расширяется при установке битов.
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Создаёт `Bitmap` с заданной длиной в битах.
    ///
    /// Все биты инициализируются значением `false` (0).
    ///
    /// # Аргументы
    ///
    /// * `bits` — количество битов, которые нужно зарезервировать.
    pub fn with_capacity(bits: usize) -> Self {
        let byte_len = bits.div_ceil(8);
        Self {
            bytes: vec![0u8; byte_len],
        }
    }

    /// Устанавливает бит по заданному смещению `bit_offset` в
    /// значение `value`.
    ///
    /// При необходимости битовый массив автоматически расширяется.
    ///
    /// # Возвращает
    ///
    /// `true`, если значение бита **до изменения** было установлено,
    /// `false` — если нет.
    pub fn set_bit(
        &mut self,
        bit_offset: usize,
        value: bool,
    ) -> bool {
        let byte_index = bit_offset / 8;
        let bit_index = bit_offset % 8;

        // Расширяем массив при необходимости
        if byte_index >= self.bytes.len() {
            self.bytes.resize(byte_index + 1, 0);
        }

        let byte = &mut self.bytes[byte_index];
        let mask = 1 << (7 - bit_index);
        let old = *byte & mask != 0;

        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }

        old
    }

    /// Возвращает значение бита по заданному смещению `bit_offset`.
    ///
    /// Если бит выходит за границы текущего массива, возвращается
    /// `false`.
    pub fn get_bit(
        &self,
        bit_offset: usize,
    ) -> bool {
        let byte_index = bit_offset / 8;
        let bit_index = bit_offset % 8;

        if byte_index >= self.bytes.len() {
            return false;
        }

        let byte = self.bytes[byte_index];
        (byte >> (7 - bit_index)) & 1 == 1
    }

    /// Подсчитывает количество установленных (`true`) битов в диапазоне
    /// `[start, end)`.
    ///
    /// При выходе границ за пределы длины массива, диапазон автоматически
    /// ограничивается.
    ///
    /// # Аргументы
    ///
    /// * `start` — начало диапазона (включительно).
    /// * `end` — конец диапазона (исключительно).
    pub fn bitcount(
        &self,
        start: usize,
        end: usize,
    ) -> usize {
        let end = end.min(self.bit_len());
        let start = start.min(end);
        if start >= end {
            return 0;
        }

        let start_byte = start / 8;
        let end_byte = (end - 1) / 8;

        // Если всё в одном байте, применяем один маск
        if start_byte == end_byte {
            let sb = start % 8;
            let eb = end % 8;
            // для eb==0 считаем, что нужно взять все биты до конца байта
            let mask = if eb == 0 {
                0xFFu8 >> sb
            } else {
                (0xFFu8 >> sb) & (0xFFu8 << (8 - eb))
            };
            return BIT_COUNT_TABLE[(self.bytes[start_byte] & mask) as usize] as usize;
        }

        // Первый (частичный) байт
        let sb = start % 8;
        let first_mask = 0xFFu8 >> sb;
        let mut count = BIT_COUNT_TABLE[(self.bytes[start_byte] & first_mask) as usize] as usize;

        // Все целые байты между
        for &b in &self.bytes[start_byte + 1..end_byte] {
            count += BIT_COUNT_TABLE[b as usize] as usize;
        }

        // Последний (частичный) байт
        let eb = end % 8;
        let last_mask = if eb == 0 { 0xFFu8 } else { 0xFFu8 << (8 - eb) };
        count + BIT_COUNT_TABLE[(self.bytes[end_byte] & last_mask) as usize] as usize
    }

    /// Возвращает длину битового массива в битах (всегда кратно 8).
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Возвращает ссылку на внутренний байтовый массив (`&[u8]`).
    ///
    /// Полезно для сериализации, отправки по сети или хэширования.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl BitAnd for &Bitmap {
    type Output = Bitmap;

    fn bitand(
        self,
        rhs: Self,
    ) -> Self::Output {
        // Output length is the longest input (§4.5); a missing byte on the
        // shorter side counts as 0, which zeroes the corresponding output
        // byte under AND.
        let len = self.bytes.len().max(rhs.bytes.len());
        let mut result = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.bytes.get(i).copied().unwrap_or(0);
            let b = rhs.bytes.get(i).copied().unwrap_or(0);
            result.push(a & b);
        }
        Bitmap { bytes: result }
    }
}

impl BitOr for &Bitmap {
    type Output = Bitmap;

    fn bitor(
        self,
        rhs: Self,
    ) -> Self::Output {
        let len = self.bytes.len().max(rhs.bytes.len());
        let mut result = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.bytes.get(i).copied().unwrap_or(0);
            let b = rhs.bytes.get(i).copied().unwrap_or(0);
            result.push(a | b);
        }
        Bitmap { bytes: result }
    }
}

impl BitXor for &Bitmap {
    type Output = Bitmap;

    fn bitxor(
        self,
        rhs: Self,
    ) -> Self::Output {
        let len = self.bytes.len().max(rhs.bytes.len());
        let mut result = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.bytes.get(i).copied().unwrap_or(0);
            let b = rhs.bytes.get(i).copied().unwrap_or(0);
            result.push(a ^ b);
        }
        Bitmap { bytes: result }
    }
}

impl Not for &Bitmap {
    type Output = Bitmap;

    fn not(self) -> Self::Output {
        Bitmap {
            bytes: self.bytes.iter().map(|b| !b).collect(),
        }
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::new()
    }
}

/// The four `BITOP` variants (§4.5). `Not` only ever takes one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOpKind {
    And,
    Or,
    Xor,
    Not,
}

/// Folds `BITOP op dest key1 .. keyn` across raw byte strings. Output
/// length equals the longest input; missing bytes on shorter inputs count
/// as 0 for AND/OR/XOR. `NOT` requires exactly one input.
pub fn bitop(
    op: BitOpKind,
    inputs: &[&[u8]],
) -> Vec<u8> {
    if inputs.is_empty() {
        return Vec::new();
    }

    if op == BitOpKind::Not {
        return inputs[0].iter().map(|b| !b).collect();
    }

    let len = inputs.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut result = vec![0u8; len];

    for (i, slot) in result.iter_mut().enumerate() {
        let mut acc = inputs[0].get(i).copied().unwrap_or(0);
        for input in &inputs[1..] {
            let b = input.get(i).copied().unwrap_or(0);
            acc = match op {
                BitOpKind::And => acc & b,
                BitOpKind::Or => acc | b,
                BitOpKind::Xor => acc ^ b,
                BitOpKind::Not => unreachable!("handled above"),
            };
        }
        *slot = acc;
    }

    result
}

/// `GETBIT`: absent bytes read as 0 (§4.5).
pub fn get_bit(
    bytes: &[u8],
    offset: usize,
) -> u8 {
    let byte_index = offset / 8;
    let bit_index = offset % 8;
    match bytes.get(byte_index) {
        Some(b) => (b >> (7 - bit_index)) & 1,
        None => 0,
    }
}

/// `SETBIT`: zero-extends `bytes` so `offset`'s byte exists, returns the
/// previous bit value (§4.5).
pub fn set_bit(
    bytes: &mut Vec<u8>,
    offset: usize,
    bit: u8,
) -> u8 {
    let byte_index = offset / 8;
    let bit_index = offset % 8;

    if byte_index >= bytes.len() {
        bytes.resize(byte_index + 1, 0);
    }

    let mask = 1u8 << (7 - bit_index);
    let old = (bytes[byte_index] & mask != 0) as u8;

    if bit != 0 {
        bytes[byte_index] |= mask;
    } else {
        bytes[byte_index] &= !mask;
    }

    old
}

/// Resolves a Redis-style possibly-negative byte index against `len`,
/// clamping into `[0, len]`.
fn resolve_index(
    idx: i64,
    len: i64,
) -> i64 {
    let resolved = if idx < 0 { len + idx } else { idx };
    resolved.clamp(0, len)
}

/// `BITCOUNT key [start end]`, byte-indexed with Redis-style negative
/// index support (§4.5 supplement).
pub fn bitcount_range(
    bytes: &[u8],
    start: Option<i64>,
    end: Option<i64>,
) -> i64 {
    let len = bytes.len() as i64;
    if len == 0 {
        return 0;
    }

    let start = resolve_index(start.unwrap_or(0), len);
    // `end` is inclusive at the byte level; clamp then +1 for the
    // exclusive bit-range helper below.
    let end_inclusive = match end {
        Some(e) => resolve_index(e, len - 1).max(-1),
        None => len - 1,
    };

    if start > end_inclusive {
        return 0;
    }

    let bm = Bitmap {
        bytes: bytes.to_vec(),
    };
    bm.bitcount((start * 8) as usize, ((end_inclusive + 1) * 8) as usize) as i64
}

/// `BITPOS key bit [start [end]]`: first bit matching `bit` scanning
/// MSB-first per byte, within the (possibly open-ended) byte range.
/// Returns -1 if not found.
pub fn bitpos(
    bytes: &[u8],
    bit: u8,
    start: Option<i64>,
    end: Option<i64>,
) -> i64 {
    let len = bytes.len() as i64;
    if len == 0 {
        // Searching for a 0 bit in an empty/absent string is defined as
        // bit 0 (nothing is set); searching for 1 finds nothing.
        return if bit == 0 && start.is_none() && end.is_none() {
            0
        } else {
            -1
        };
    }

    let start_byte = resolve_index(start.unwrap_or(0), len);
    let end_byte = match end {
        Some(e) => resolve_index(e, len - 1),
        None => len - 1,
    };

    if start_byte > end_byte {
        return -1;
    }

    let no_range_given = start.is_none() && end.is_none();

    for byte_idx in start_byte..=end_byte {
        let byte = bytes[byte_idx as usize];
        for bit_idx in 0..8u32 {
            let candidate = (byte >> (7 - bit_idx)) & 1;
            if candidate == bit {
                return byte_idx * 8 + bit_idx as i64;
            }
        }
    }

    // Searching for a 0 bit with no explicit range and the string is all
    // 1s: Redis treats the implicit zero-padding past the string's end as
    // a match.
    if bit == 0 && no_range_given {
        return len * 8;
    }

    -1
}

/// A `BITFIELD` sub-field type: `u1`..`u63` or `i1`..`i64` (§4.5
/// supplement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub signed: bool,
    pub bits: u8,
}

impl FieldType {
    pub fn parse(spec: &str) -> Option<Self> {
        let (signed, rest) = match spec.as_bytes().first()? {
            b'u' => (false, &spec[1..]),
            b'i' => (true, &spec[1..]),
            _ => return None,
        };
        let bits: u8 = rest.parse().ok()?;
        let max = if signed { 64 } else { 63 };
        if bits == 0 || bits > max {
            return None;
        }
        Some(FieldType { signed, bits })
    }
}

/// Resolves a `BITFIELD` offset token: `#N` means `N * width` bits,
/// otherwise it's a literal bit offset (§4.5 supplement).
pub fn resolve_bitfield_offset(
    token: &str,
    width: u8,
) -> Option<usize> {
    if let Some(rest) = token.strip_prefix('#') {
        let n: usize = rest.parse().ok()?;
        Some(n * width as usize)
    } else {
        token.parse().ok()
    }
}

/// Reads `bits` (1..=64) MSB-first starting at bit `offset`, zero-extending
/// past the end of `bytes` the same way `GETBIT` treats missing bytes as 0.
fn read_raw_bits(
    bytes: &[u8],
    offset: usize,
    bits: u8,
) -> u64 {
    let mut value: u64 = 0;
    for i in 0..bits as usize {
        let bit = get_bit(bytes, offset + i);
        value = (value << 1) | bit as u64;
    }
    value
}

/// Writes the low `bits` bits of `value` MSB-first starting at bit
/// `offset`, zero-extending `bytes` as needed (§4.5 supplement, mirrors
/// `SETBIT`'s auto-growth).
fn write_raw_bits(
    bytes: &mut Vec<u8>,
    offset: usize,
    bits: u8,
    value: u64,
) {
    for i in 0..bits as usize {
        let shift = bits as usize - 1 - i;
        let bit = ((value >> shift) & 1) as u8;
        set_bit(bytes, offset + i, bit);
    }
}

fn sign_extend(
    raw: u64,
    bits: u8,
) -> i64 {
    if bits == 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (bits - 1);
    if raw & sign_bit != 0 {
        (raw | (!0u64 << bits)) as i64
    } else {
        raw as i64
    }
}

fn wrap_to_width(
    value: i64,
    ty: FieldType,
) -> u64 {
    if ty.bits == 64 {
        return value as u64;
    }
    let mask = (1u64 << ty.bits) - 1;
    (value as u64) & mask
}

/// `BITFIELD key GET type offset` (§4.5 supplement).
pub fn bitfield_get(
    bytes: &[u8],
    ty: FieldType,
    offset: usize,
) -> i64 {
    let raw = read_raw_bits(bytes, offset, ty.bits);
    if ty.signed {
        sign_extend(raw, ty.bits)
    } else {
        raw as i64
    }
}

/// `BITFIELD key SET type offset value`: returns the previous value
/// (§4.5 supplement).
pub fn bitfield_set(
    bytes: &mut Vec<u8>,
    ty: FieldType,
    offset: usize,
    value: i64,
) -> i64 {
    let old = bitfield_get(bytes, ty, offset);
    write_raw_bits(bytes, offset, ty.bits, wrap_to_width(value, ty));
    old
}

/// `BITFIELD key INCRBY type offset increment`: wraps around the field's
/// width on overflow (Redis's default `WRAP` mode — no `OVERFLOW`
/// sub-command support, §9 open questions), returning the new value
/// (§4.5 supplement).
pub fn bitfield_incrby(
    bytes: &mut Vec<u8>,
    ty: FieldType,
    offset: usize,
    increment: i64,
) -> i64 {
    let old = bitfield_get(bytes, ty, offset);
    let wrapped = wrap_to_width(old.wrapping_add(increment), ty);
    write_raw_bits(bytes, offset, ty.bits, wrapped);
    bitfield_get(bytes, ty, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет корректность установки и получения значений
    /// отдельных битов.
    #[test]
    fn test_set_get_bit() {
        let mut bitmap = Bitmap::new();
        assert!(!bitmap.set_bit(5, true));
        assert!(bitmap.get_bit(5));
        assert!(bitmap.set_bit(5, false));
        assert!(!bitmap.get_bit(5));
    }

    /// Тест проверяет подсчёт установленных битов в заданном диапазоне.
    #[test]
    fn test_bitcount() {
        let mut bitmap = Bitmap::new();
        bitmap.set_bit(0, true);
        bitmap.set_bit(3, true);
        bitmap.set_bit(15, true);
        assert_eq!(bitmap.bitcount(0, 16), 3);
        assert_eq!(bitmap.bitcount(4, 15), 0);
    }

    /// Тест проверяет побитовые операции `AND`, `OR`, `XOR` между двумя
    /// Bitmap.
    #[test]
    fn test_bitop_and_or_xor() {
        let mut a = Bitmap::new();
        let mut b = Bitmap::new();

        a.set_bit(1, true);
        a.set_bit(3, true);
        b.set_bit(3, true);
        b.set_bit(4, true);

        let and = &a & &b;
        let or = &a | &b;
        let xor = &a ^ &b;

        assert!(and.get_bit(3));
        assert!(!and.get_bit(1));
        assert!(or.get_bit(1));
        assert!(or.get_bit(4));
        assert!(xor.get_bit(1));
        assert!(!xor.get_bit(3));
        assert!(xor.get_bit(4));
    }

    /// Тест проверяет побитовую операцию `NOT` над Bitmap.
    #[test]
    fn test_bitop_not() {
        let mut bitmap = Bitmap::with_capacity(8);
        bitmap.set_bit(1, true);
        bitmap.set_bit(7, true);
        let not = &bitmap.not();

        assert!(!not.get_bit(1));
        assert!(not.get_bit(0));
        assert!(!not.get_bit(7));
    }

    #[test]
    fn bitfield_type_parsing() {
        assert_eq!(FieldType::parse("u8"), Some(FieldType { signed: false, bits: 8 }));
        assert_eq!(FieldType::parse("i16"), Some(FieldType { signed: true, bits: 16 }));
        assert_eq!(FieldType::parse("u64"), None);
        assert_eq!(FieldType::parse("i65"), None);
        assert_eq!(FieldType::parse("x8"), None);
    }

    #[test]
    fn bitfield_offset_resolution() {
        assert_eq!(resolve_bitfield_offset("#3", 8), Some(24));
        assert_eq!(resolve_bitfield_offset("10", 8), Some(10));
    }

    #[test]
    fn bitfield_set_and_get_roundtrip() {
        let mut bytes = Vec::new();
        let ty = FieldType::parse("u8").unwrap();
        let old = bitfield_set(&mut bytes, ty, 0, 200);
        assert_eq!(old, 0);
        assert_eq!(bitfield_get(&bytes, ty, 0), 200);
    }

    #[test]
    fn bitfield_signed_sign_extends() {
        let mut bytes = Vec::new();
        let ty = FieldType::parse("i8").unwrap();
        bitfield_set(&mut bytes, ty, 0, -1);
        assert_eq!(bitfield_get(&bytes, ty, 0), -1);
    }

    #[test]
    fn bitfield_incrby_wraps_on_overflow() {
        let mut bytes = Vec::new();
        let ty = FieldType::parse("u8").unwrap();
        bitfield_set(&mut bytes, ty, 0, 250);
        let new = bitfield_incrby(&mut bytes, ty, 0, 10);
        assert_eq!(new, 4);
    }
}
