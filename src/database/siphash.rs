//! Процесс-глобальный ключ SipHash-2-4 и вспомогательные функции хеширования.
//!
//! Все структуры, которым нужна устойчивость к hash-flooding (`Dict`,
//! адаптивный `Set`), хешируют байтовые ключи через один и тот же
//! 16-байтовый ключ, сгенерированный один раз при старте процесса.
//! Ключ копируется по значению в каждую структуру — он дёшев (16 байт)
//! и это избавляет контейнеры от lifetime-параметра.

use std::hash::{Hash, Hasher};

use rand::RngCore;
use siphasher::sip::SipHasher24;

/// 16-байтовый ключ SipHash-2-4 (две половины по 8 байт).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipHashKey {
    k0: u64,
    k1: u64,
}

impl SipHashKey {
    /// Генерирует новый случайный ключ (источник — `rand::thread_rng`).
    pub fn generate() -> Self {
        let mut buf = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut buf);
        Self::from_bytes(buf)
    }

    /// Строит ключ из заданных 16 байт (используется в тестах для
    /// воспроизводимости).
    pub fn from_bytes(buf: [u8; 16]) -> Self {
        let k0 = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let k1 = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        Self { k0, k1 }
    }

    /// Хеширует произвольную последовательность байт этим ключом.
    pub fn hash_bytes(
        &self,
        data: &[u8],
    ) -> u64 {
        let mut hasher = self.build_hasher();
        hasher.write(data);
        hasher.finish()
    }

    /// Хеширует значение, реализующее `std::hash::Hash`, этим ключом.
    pub fn hash_one<T: std::hash::Hash + ?Sized>(
        &self,
        value: &T,
    ) -> u64 {
        let mut hasher = self.build_hasher();
        value.hash(&mut hasher);
        hasher.finish()
    }

    /// Создаёт свежий экземпляр `SipHasher24`, заряженный этим ключом.
    #[inline]
    pub fn build_hasher(&self) -> SipHasher24 {
        SipHasher24::new_with_keys(self.k0, self.k1)
    }
}

impl Default for SipHashKey {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_same_hash() {
        let key = SipHashKey::from_bytes([1; 16]);
        assert_eq!(key.hash_bytes(b"hello"), key.hash_bytes(b"hello"));
    }

    #[test]
    fn different_keys_differ() {
        let a = SipHashKey::from_bytes([1; 16]);
        let b = SipHashKey::from_bytes([2; 16]);
        assert_ne!(a.hash_bytes(b"hello"), b.hash_bytes(b"hello"));
    }

    #[test]
    fn different_input_differ() {
        let key = SipHashKey::from_bytes([7; 16]);
        assert_ne!(key.hash_bytes(b"foo"), key.hash_bytes(b"bar"));
    }
}
