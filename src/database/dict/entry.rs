//! API записи (`Entry`) поверх `Dict`, в духе
//! `std::collections::HashMap::entry` — позволяет выразить паттерны
//! "вставь, если отсутствует" и "измени, если присутствует" одним
//! выражением.

use std::hash::Hash;

use super::dict_base::Dict;

/// Запись в словаре: либо занята существующим значением, либо свободна.
pub enum Entry<'a, K, V>
where
    K: Hash + Eq,
{
    Occupied(OccupiedEntry<'a, K, V>),
    Vacant(VacantEntry<'a, K, V>),
}

pub struct OccupiedEntry<'a, K, V>
where
    K: Hash + Eq,
{
    dict: &'a mut Dict<K, V>,
    key: K,
}

pub struct VacantEntry<'a, K, V>
where
    K: Hash + Eq,
{
    dict: &'a mut Dict<K, V>,
    key: K,
}

impl<'a, K, V> Entry<'a, K, V>
where
    K: Hash + Eq,
{
    pub(super) fn new(
        dict: &'a mut Dict<K, V>,
        key: K,
    ) -> Self {
        if dict.contains_key(&key) {
            Entry::Occupied(OccupiedEntry { dict, key })
        } else {
            Entry::Vacant(VacantEntry { dict, key })
        }
    }

    /// Возвращает значение, вставляя `default`, если запись была свободна.
    pub fn or_insert(
        self,
        default: V,
    ) -> &'a mut V {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(default),
        }
    }

    /// Возвращает значение, вставляя результат `f()`, если запись была
    /// свободна.
    pub fn or_insert_with<F: FnOnce() -> V>(
        self,
        f: F,
    ) -> &'a mut V {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(f()),
        }
    }

    /// Как `or_insert_with`, но функция получает ссылку на ключ записи.
    pub fn or_insert_with_key<F: FnOnce(&K) -> V>(
        self,
        f: F,
    ) -> &'a mut V {
        match self {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let val = f(&e.key);
                e.insert(val)
            }
        }
    }

    /// Применяет `f` к значению, если запись занята; свободную запись не
    /// трогает.
    pub fn and_modify<F: FnOnce(&mut V)>(
        self,
        f: F,
    ) -> Self {
        match self {
            Entry::Occupied(mut e) => {
                f(e.get_mut());
                Entry::Occupied(e)
            }
            Entry::Vacant(e) => Entry::Vacant(e),
        }
    }

    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(e) => e.key(),
            Entry::Vacant(e) => e.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    K: Hash + Eq,
    V: Default,
{
    /// Возвращает значение, вставляя `V::default()`, если запись была
    /// свободна.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

impl<'a, K, V> OccupiedEntry<'a, K, V>
where
    K: Hash + Eq,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn get(&self) -> &V {
        self.dict
            .get(&self.key)
            .expect("OccupiedEntry invariant: key is present")
    }

    pub fn get_mut(&mut self) -> &mut V {
        self.dict
            .get_mut(&self.key)
            .expect("OccupiedEntry invariant: key is present")
    }

    pub fn into_mut(self) -> &'a mut V {
        self.dict
            .get_mut(&self.key)
            .expect("OccupiedEntry invariant: key is present")
    }

    /// Заменяет значение, возвращая старое.
    pub fn insert(
        &mut self,
        value: V,
    ) -> V {
        std::mem::replace(self.get_mut(), value)
    }

    /// Удаляет запись из словаря и возвращает её значение.
    pub fn remove(self) -> V {
        self.dict
            .take(&self.key)
            .expect("OccupiedEntry invariant: key is present")
    }
}

impl<'a, K, V> VacantEntry<'a, K, V>
where
    K: Hash + Eq,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K, V> VacantEntry<'a, K, V>
where
    K: Hash + Eq + Clone,
{
    /// Вставляет значение под ключ этой записи и возвращает ссылку на него.
    pub fn insert(self, value: V) -> &'a mut V {
        let key_for_lookup = self.key.clone();
        self.dict.insert(self.key, value);
        self.dict
            .get_mut(&key_for_lookup)
            .expect("VacantEntry invariant: key was just inserted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::siphash::SipHashKey;

    fn dict() -> Dict<String, i32> {
        Dict::with_hash_key(SipHashKey::from_bytes([3; 16]))
    }

    #[test]
    fn or_insert_on_vacant_inserts() {
        let mut d = dict();
        *d.entry("a".to_string()).or_insert(1) += 10;
        assert_eq!(d.get("a"), Some(&11));
    }

    #[test]
    fn or_insert_on_occupied_keeps_value() {
        let mut d = dict();
        d.insert("a".to_string(), 1);
        *d.entry("a".to_string()).or_insert(999) += 1;
        assert_eq!(d.get("a"), Some(&2));
    }

    #[test]
    fn and_modify_then_or_insert() {
        let mut d = dict();
        d.entry("counter".to_string())
            .and_modify(|v| *v += 1)
            .or_insert(0);
        assert_eq!(d.get("counter"), Some(&0));

        d.entry("counter".to_string())
            .and_modify(|v| *v += 1)
            .or_insert(0);
        assert_eq!(d.get("counter"), Some(&1));
    }

    #[test]
    fn or_default_inserts_default() {
        let mut d = dict();
        let v = d.entry("z".to_string()).or_default();
        assert_eq!(*v, 0);
    }

    #[test]
    fn occupied_remove_returns_value() {
        let mut d = dict();
        d.insert("k".to_string(), 42);
        if let Entry::Occupied(e) = d.entry("k".to_string()) {
            assert_eq!(e.remove(), 42);
        } else {
            panic!("expected occupied entry");
        }
        assert_eq!(d.get("k"), None);
    }

    #[test]
    fn survives_rehash_during_entry_use() {
        let mut d = dict();
        for i in 0..200 {
            *d.entry(format!("k{i}")).or_insert(0) += 1;
        }
        for i in 0..200 {
            assert_eq!(d.get(&format!("k{i}")), Some(&1));
        }
    }
}
