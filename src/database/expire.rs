//! Индекс истечения срока жизни ключей (§4.7).
//!
//! Хранит отображение ключ → абсолютный дедлайн в миллисекундах с эпохи.
//! Не вычищает просроченные ключи сам по себе на каждом обращении —
//! вместо этого обслуживающий тик реактора периодически вызывает
//! [`ExpireIndex::sweep`], который сэмплирует ограниченное число записей
//! (`MAX_EXPIRE_LOOKUPS_PER_CYCLE`), в духе активного истечения Redis, а
//! не полного сканирования при каждом чтении.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::database::{dict::Dict, siphash::SipHashKey};

/// Число записей, сэмплируемых за один обслуживающий тик (§4.7, §5).
pub const MAX_EXPIRE_LOOKUPS_PER_CYCLE: usize = 20;

/// Отображение ключ → дедлайн (миллисекунды с эпохи Unix).
///
/// Инвариант: каждый ключ в этом индексе также присутствует в keyspace;
/// обратное не требуется. Поддержание этого инварианта — забота вызывающей
/// стороны ([`crate::database::keyspace::Db`]), не самого индекса.
pub struct ExpireIndex {
    deadlines: Dict<Vec<u8>, i64>,
}

impl ExpireIndex {
    pub fn new() -> Self {
        Self::with_hash_key(SipHashKey::generate())
    }

    pub fn with_hash_key(hash_key: SipHashKey) -> Self {
        Self {
            deadlines: Dict::with_hash_key(hash_key),
        }
    }

    /// Текущее время в миллисекундах с эпохи Unix.
    pub fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_millis() as i64
    }

    /// Устанавливает абсолютный дедлайн (мс) для `key`.
    pub fn set(
        &mut self,
        key: Vec<u8>,
        deadline_ms: i64,
    ) {
        self.deadlines.insert(key, deadline_ms);
    }

    /// Снимает TTL с `key` (путь PERSIST / перезапись без TTL / удаление
    /// ключа).
    pub fn remove(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.deadlines.remove(key)
    }

    pub fn deadline(
        &self,
        key: &[u8],
    ) -> Option<i64> {
        self.deadlines.get(key).copied()
    }

    /// `true` если `key` имеет дедлайн и он уже в прошлом по отношению к
    /// `now_ms`.
    pub fn is_expired(
        &self,
        key: &[u8],
        now_ms: i64,
    ) -> bool {
        matches!(self.deadline(key), Some(d) if d < now_ms)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Сэмплирует до `MAX_EXPIRE_LOOKUPS_PER_CYCLE` записей и возвращает те
    /// ключи, чей дедлайн уже прошёл, удаляя их заодно из этого индекса.
    /// Вызывающая сторона отвечает за удаление тех же ключей из keyspace.
    ///
    /// Порядок сэмплирования не определён, но гарантированно продвигается
    /// между вызовами: `Dict::random_entry` выбирает равномерно случайный
    /// живой бакет на каждой итерации.
    pub fn sweep(
        &mut self,
        now_ms: i64,
    ) -> Vec<Vec<u8>> {
        self.sweep_with_limit(now_ms, MAX_EXPIRE_LOOKUPS_PER_CYCLE)
    }

    pub fn sweep_with_limit(
        &mut self,
        now_ms: i64,
        limit: usize,
    ) -> Vec<Vec<u8>> {
        let mut expired = Vec::new();

        for _ in 0..limit {
            if self.deadlines.is_empty() {
                break;
            }

            let Some((key, deadline)) = self.deadlines.random_entry() else {
                break;
            };

            if *deadline >= now_ms {
                continue;
            }

            let key = key.clone();
            self.deadlines.remove(&key);
            expired.push(key);
        }

        expired
    }
}

impl Default for ExpireIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SipHashKey {
        SipHashKey::from_bytes([11; 16])
    }

    #[test]
    fn set_and_deadline() {
        let mut idx = ExpireIndex::with_hash_key(key());
        idx.set(b"foo".to_vec(), 1_000);
        assert_eq!(idx.deadline(b"foo"), Some(1_000));
        assert_eq!(idx.deadline(b"bar"), None);
    }

    #[test]
    fn remove_clears_deadline() {
        let mut idx = ExpireIndex::with_hash_key(key());
        idx.set(b"foo".to_vec(), 1_000);
        assert!(idx.remove(b"foo"));
        assert_eq!(idx.deadline(b"foo"), None);
        assert!(!idx.remove(b"foo"));
    }

    #[test]
    fn is_expired_respects_now() {
        let mut idx = ExpireIndex::with_hash_key(key());
        idx.set(b"foo".to_vec(), 1_000);
        assert!(!idx.is_expired(b"foo", 500));
        assert!(idx.is_expired(b"foo", 1_500));
    }

    #[test]
    fn sweep_removes_expired_and_keeps_live() {
        let mut idx = ExpireIndex::with_hash_key(key());
        idx.set(b"dead".to_vec(), 100);
        idx.set(b"alive".to_vec(), 10_000);

        let mut expired = Vec::new();
        for _ in 0..50 {
            expired.extend(idx.sweep(5_000));
            if idx.is_empty() || expired.contains(&b"dead".to_vec()) {
                break;
            }
        }

        assert!(expired.contains(&b"dead".to_vec()));
        assert!(!expired.contains(&b"alive".to_vec()));
        assert_eq!(idx.deadline(b"alive"), Some(10_000));
    }

    #[test]
    fn sweep_is_bounded_per_call() {
        let mut idx = ExpireIndex::with_hash_key(key());
        for i in 0..100u32 {
            idx.set(i.to_string().into_bytes(), 0);
        }
        let expired = idx.sweep_with_limit(5_000, MAX_EXPIRE_LOOKUPS_PER_CYCLE);
        assert!(expired.len() <= MAX_EXPIRE_LOOKUPS_PER_CYCLE);
    }
}
