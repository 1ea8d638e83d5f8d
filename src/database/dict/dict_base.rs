use std::hash::Hash;

use crate::database::siphash::SipHashKey;

/// Начальный размер таблицы (степень двойки).
const INITIAL_SIZE: usize = 4;

/// Максимальное число элементов, которое мы когда-либо допускаем
/// в одной хеш-таблице — защита от переполнения `size_mask`/`used`
/// на 32-битных платформах.
const MAX_SIZE: usize = 1 << 63;

/// Множитель бюджета сканирования пустых бакетов при рехешировании:
/// `rehash(n)` просматривает не более `n * EMPTY_SCAN_FACTOR` бакетов,
/// даже если все они пусты, прежде чем вернуть управление вызывающей
/// стороне.
const EMPTY_SCAN_FACTOR: usize = 10;

/// Один элемент в цепочке коллизий.
#[derive(Debug, PartialEq, Eq, Clone)]
struct Node<K, V> {
    key: K,
    val: V,
    next: Option<Box<Node<K, V>>>,
}

impl<K, V> Node<K, V> {
    fn new(
        key: K,
        val: V,
        next: Option<Box<Node<K, V>>>,
    ) -> Box<Self> {
        Box::new(Node { key, val, next })
    }
}

/// Одна хеш-таблица: вектор бакетов, маска размера и количество занятых
/// элементов.
#[derive(Debug, PartialEq, Eq, Clone)]
struct HashTable<K, V> {
    buckets: Vec<Option<Box<Node<K, V>>>>,
    size_mask: usize,
    used: usize,
}

impl<K, V> HashTable<K, V> {
    /// Создаёт таблицу ёмкостью `cap` бакетов (округляется вверх до степени
    /// двойки, не меньше `INITIAL_SIZE`). `cap == 0` даёт пустую
    /// (неинициализированную) таблицу.
    fn with_capacity(cap: usize) -> Self {
        if cap == 0 {
            return HashTable {
                buckets: Vec::new(),
                size_mask: 0,
                used: 0,
            };
        }

        let sz = cap.next_power_of_two().max(INITIAL_SIZE).min(MAX_SIZE);
        let mut buckets = Vec::with_capacity(sz);
        buckets.resize_with(sz, || None);

        HashTable {
            buckets,
            size_mask: sz - 1,
            used: 0,
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.size_mask = 0;
        self.used = 0;
    }

    #[inline]
    fn is_empty_table(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Хеш-таблица с инкрементальным рехешированием в духе Redis `dict.c`.
///
/// **Инварианты:**
///
/// - Если `rehash_idx == -1`: ht[1] пуста, все элементы находятся в ht[0].
/// - Если `rehash_idx >= 0`: рехеширование в процессе, элементы распределены
///   между ht[0] и ht[1]; `rehash_idx` — индекс следующего непросмотренного
///   бакета ht[0].
/// - `len() == ht[0].used + ht[1].used` всегда.
///
/// Рехеширование не происходит "всё и сразу": каждый вызов `insert`, `remove`
/// или `get_mut` выполняет один ограниченный шаг (`rehash(1)`), так что
/// задержка переноса распределяется по множеству операций и не создаёт
/// паузы на крупных словарях. Вызывающая сторона (например, обслуживающий
/// тик реактора) может также вызвать `rehash(n)` напрямую, чтобы
/// форсированно продвинуть миграцию вне обычных операций.
#[derive(Debug, Clone)]
pub struct Dict<K, V> {
    ht: [HashTable<K, V>; 2],
    rehash_idx: isize,
    hash_key: SipHashKey,
}

/// Итератор по словарю `Dict` (разделяемая ссылка).
pub struct DictIter<'a, K, V> {
    tables: [&'a HashTable<K, V>; 2],
    table_idx: usize,
    bucket_idx: usize,
    current_entry: Option<&'a Node<K, V>>,
}

impl<K, V> Dict<K, V>
where
    K: Hash + Eq,
{
    /// Создаёт новый пустой словарь со случайным ключом SipHash.
    pub fn new() -> Self {
        Self::with_hash_key(SipHashKey::generate())
    }

    /// Создаёт словарь, использующий заданный ключ SipHash. Используется,
    /// когда несколько словарей (например, keyspace и поля одного Hash-
    /// значения) должны делить один и тот же процесс-глобальный ключ.
    pub fn with_hash_key(hash_key: SipHashKey) -> Self {
        Dict {
            ht: [HashTable::with_capacity(0), HashTable::with_capacity(0)],
            rehash_idx: -1,
            hash_key,
        }
    }

    /// Ключ SipHash, которым хеширует этот словарь.
    pub fn hash_key(&self) -> &SipHashKey {
        &self.hash_key
    }

    /// Вставляет пару `(key, val)`. Возвращает `true`, если ключа раньше не
    /// было (новая вставка), `false` — если значение существующего ключа
    /// было обновлено.
    pub fn insert(
        &mut self,
        key: K,
        val: V,
    ) -> bool {
        self.expand_if_needed();
        self.rehash(1);

        let hash = self.hash_of(&key);

        for table_idx in 0..=1 {
            if self.ht[table_idx].is_empty_table() {
                continue;
            }

            let mask = self.ht[table_idx].size_mask;
            let slot = (hash as usize) & mask;
            let mut cur = &mut self.ht[table_idx].buckets[slot];

            while let Some(ref mut e) = cur {
                if e.key == key {
                    e.val = val;
                    return false;
                }
                cur = &mut e.next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        let table_idx = if self.is_rehashing() { 1 } else { 0 };
        let mask = self.ht[table_idx].size_mask;
        let slot = (hash as usize) & mask;

        let next = self.ht[table_idx].buckets[slot].take();
        self.ht[table_idx].buckets[slot] = Some(Node::new(key, val, next));
        self.ht[table_idx].used += 1;

        true
    }

    /// Возвращает `Some(&V)` для указанного ключа или `None`.
    pub fn get<Q>(
        &self,
        key: &Q,
    ) -> Option<&V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key.hash_one(key);

        for table_idx in 0..=1 {
            if self.ht[table_idx].is_empty_table() {
                continue;
            }

            let slot = (hash as usize) & self.ht[table_idx].size_mask;
            let mut cur = &self.ht[table_idx].buckets[slot];

            while let Some(ref e) = cur {
                if e.key.borrow() == key {
                    return Some(&e.val);
                }
                cur = &e.next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Возвращает `true`, если ключ присутствует.
    pub fn contains_key<Q>(
        &self,
        key: &Q,
    ) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Возвращает `Some(&mut V)` для указанного ключа или `None`.
    pub fn get_mut<Q>(
        &mut self,
        key: &Q,
    ) -> Option<&mut V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_rehashing() {
            self.rehash(1);
        }

        let hash = self.hash_key.hash_one(key);

        for table_idx in 0..=1 {
            if self.ht[table_idx].is_empty_table() {
                continue;
            }

            let slot = (hash as usize) & self.ht[table_idx].size_mask;
            let mut cur = &mut self.ht[table_idx].buckets[slot];

            while let Some(node) = cur {
                if node.key.borrow() == key {
                    return Some(&mut node.val);
                }
                cur = &mut node.next;
            }

            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Возвращает запись по ключу для модификации "на месте" без двойного
    /// поиска (аналог `std::collections::HashMap::entry`).
    pub fn entry(
        &mut self,
        key: K,
    ) -> super::entry::Entry<'_, K, V> {
        super::entry::Entry::new(self, key)
    }

    /// Удаляет ключ. Возвращает `true`, если удаление произошло.
    pub fn remove<Q>(
        &mut self,
        key: &Q,
    ) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Удаляет ключ и возвращает снятое значение, если оно было.
    pub fn take<Q>(
        &mut self,
        key: &Q,
    ) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_rehashing() {
            self.rehash(1);
        }

        let hash = self.hash_key.hash_one(key);

        for table_idx in 0..=1 {
            let table = &mut self.ht[table_idx];
            if table.is_empty_table() {
                continue;
            }

            let slot = (hash as usize) & table.size_mask;
            if let Some(node) = Self::take_from_chain(&mut table.buckets[slot], key) {
                table.used -= 1;
                return Some(node.val);
            }

            if !self.is_rehashing() {
                break;
            }
        }

        None
    }

    /// Возвращает общее количество элементов во всех таблицах.
    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    /// Возвращает `true`, если словарь пуст.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Очищает словарь и сбрасывает рехеширование.
    pub fn clear(&mut self) {
        self.ht[0].clear();
        self.ht[1].clear();
        self.rehash_idx = -1;
    }

    /// Возвращает `true`, если в данный момент идёт инкрементальное
    /// рехеширование.
    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    /// Возвращает итератор по парам `(&K, &V)`.
    pub fn iter(&self) -> DictIter<'_, K, V> {
        DictIter {
            tables: [&self.ht[0], &self.ht[1]],
            table_idx: 0,
            bucket_idx: 0,
            current_entry: None,
        }
    }

    /// Возвращает случайную пару `(&K, &V)`, либо `None`, если словарь пуст.
    ///
    /// Используется для `SRANDMEMBER`/`SPOP` без аргумента count и для
    /// диагностики. Выбирает случайный непустой бакет активной таблицы
    /// (или одной из двух, если идёт рехеширование), затем случайный узел
    /// его цепочки — без полного обхода словаря.
    pub fn random_entry(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }

        use rand::Rng;
        let mut rng = rand::thread_rng();

        loop {
            let table_idx = if self.is_rehashing() {
                rng.gen_range(0..=1)
            } else {
                0
            };

            let table = &self.ht[table_idx];
            if table.is_empty_table() || table.used == 0 {
                continue;
            }

            let slot = rng.gen_range(0..table.buckets.len());
            let Some(mut node) = table.buckets[slot].as_deref() else {
                continue;
            };

            let mut chain_len = 1;
            let mut cur = node;
            while let Some(next) = cur.next.as_deref() {
                chain_len += 1;
                cur = next;
            }

            let pick = rng.gen_range(0..chain_len);
            for _ in 0..pick {
                node = node.next.as_deref().expect("chain length computed above");
            }

            return Some((&node.key, &node.val));
        }
    }

    /// Продвигает инкрементальное рехеширование не более чем на `n` непустых
    /// бакетов, ограничивая просмотр пустых бакетов бюджетом
    /// `n * EMPTY_SCAN_FACTOR`. Возвращает `true`, если рехеширование ещё не
    /// завершено после вызова (остались бакеты для переноса), `false` —
    /// если рехеширования не было или оно было завершено этим вызовом.
    pub fn rehash(
        &mut self,
        n: usize,
    ) -> bool {
        if !self.is_rehashing() {
            return false;
        }

        let mut moved = 0usize;
        let mut empty_budget = n.saturating_mul(EMPTY_SCAN_FACTOR);

        while moved < n {
            let idx = self.rehash_idx as usize;

            if idx >= self.ht[0].buckets.len() {
                self.ht[0] = std::mem::replace(&mut self.ht[1], HashTable::with_capacity(0));
                self.rehash_idx = -1;
                return false;
            }

            if self.ht[0].buckets[idx].is_none() {
                self.rehash_idx += 1;
                if empty_budget == 0 {
                    return true;
                }
                empty_budget -= 1;
                continue;
            }

            let mut entry_opt = self.ht[0].buckets[idx].take();
            while let Some(mut e) = entry_opt {
                entry_opt = e.next.take();

                let hash = self.hash_key.hash_one(&e.key);
                let slot = (hash as usize) & self.ht[1].size_mask;

                e.next = self.ht[1].buckets[slot].take();
                self.ht[1].buckets[slot] = Some(e);
                self.ht[0].used -= 1;
                self.ht[1].used += 1;
            }

            self.rehash_idx += 1;
            moved += 1;
        }

        self.is_rehashing()
    }

    fn take_from_chain<Q>(
        head: &mut Option<Box<Node<K, V>>>,
        key: &Q,
    ) -> Option<Box<Node<K, V>>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut cur = head;
        loop {
            match cur {
                None => return None,
                Some(node) if node.key.borrow() == key => {
                    let mut node = cur.take().expect("matched Some above");
                    *cur = node.next.take();
                    return Some(node);
                }
                Some(node) => cur = &mut node.next,
            }
        }
    }

    #[inline]
    fn hash_of(
        &self,
        key: &K,
    ) -> u64 {
        self.hash_key.hash_one(key)
    }

    /// Инициирует рехеширование в увеличенную таблицу, если load factor ≥ 1.
    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }

        let size = self.ht[0].buckets.len();
        let used = self.ht[0].used;

        if size == 0 {
            self.ht[0] = HashTable::with_capacity(INITIAL_SIZE);
        } else if used >= size && size < MAX_SIZE {
            self.ht[1] = HashTable::with_capacity(size * 2);
            self.rehash_idx = 0;
        }
    }

    /// Оператор-триггерное сжатие: если рехеширование не идёт, ужимает
    /// таблицу до `max(INITIAL_SIZE, used)`, округлённого вверх до степени
    /// двойки. Автоматического сжатия не бывает — только по явному вызову.
    pub fn resize(&mut self) {
        if self.is_rehashing() {
            return;
        }

        let target = self.ht[0].used.max(INITIAL_SIZE);
        if target == self.ht[0].buckets.len() {
            return;
        }

        self.ht[1] = HashTable::with_capacity(target);
        self.rehash_idx = 0;
    }

    /// Выполняет `rehash(100)` в цикле, пока рехеширование не завершится или
    /// не истечёт `ms` миллисекунд настенного времени. Это "фоновый" драйвер,
    /// которым обслуживающий тик реактора продвигает миграцию вне обычных
    /// операций чтения/записи.
    pub fn rehash_milliseconds(
        &mut self,
        ms: u64,
    ) -> bool {
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(ms);

        while self.is_rehashing() {
            if !self.rehash(100) {
                break;
            }
            if std::time::Instant::now() >= deadline {
                break;
            }
        }

        self.is_rehashing()
    }
}

impl<'a, K, V> Iterator for DictIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current_entry.take() {
                self.current_entry = entry.next.as_deref();
                return Some((&entry.key, &entry.val));
            }

            if self.bucket_idx >= self.tables[self.table_idx].buckets.len() {
                if self.table_idx == 0 && !self.tables[1].is_empty_table() {
                    self.table_idx = 1;
                    self.bucket_idx = 0;
                    continue;
                }
                return None;
            }

            self.current_entry = self.tables[self.table_idx].buckets[self.bucket_idx].as_deref();
            self.bucket_idx += 1;
        }
    }
}

impl<'a, K, V> IntoIterator for &'a Dict<K, V>
where
    K: Hash + Eq,
{
    type Item = (&'a K, &'a V);
    type IntoIter = DictIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> Default for Dict<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_key() -> SipHashKey {
        SipHashKey::from_bytes([9; 16])
    }

    /// Тест проверяет базовые операции вставки и получения значений по
    /// ключу.
    #[test]
    fn basic_insert_get() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        assert!(d.insert("a", 1));
        assert!(d.insert("b", 2));
        assert_eq!(d.get("a"), Some(&1));
        assert_eq!(d.get("b"), Some(&2));
        assert_eq!(d.get("c"), None);
        assert!(!d.insert("a", 10));
        assert_eq!(d.get("a"), Some(&10));
    }

    #[test]
    fn insert_updates_existing_key() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        assert!(d.insert("key", 42));
        assert!(!d.insert("key", 100));
        assert_eq!(d.get("key"), Some(&100));
    }

    #[test]
    fn removal() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        d.insert("x", 100);
        assert_eq!(d.get("x"), Some(&100));
        assert!(d.remove("x"));
        assert_eq!(d.get("x"), None);
        assert!(!d.remove("x"));
    }

    #[test]
    fn rehash_behavior() {
        let mut d: Dict<i32, i32> = Dict::with_hash_key(fixed_key());
        for i in 0..100 {
            d.insert(i, i * 10);
        }
        for i in 0..100 {
            assert_eq!(d.get(&i), Some(&(i * 10)));
        }
        assert_eq!(d.len(), 100);
    }

    #[test]
    fn rehash_with_removal() {
        let mut d: Dict<i32, i32> = Dict::with_hash_key(fixed_key());
        for i in 0..20 {
            d.insert(i, i);
        }
        for i in 0..10 {
            assert!(d.remove(&i));
        }
        for i in 0..10 {
            assert_eq!(d.get(&i), None);
        }
        for i in 10..20 {
            assert_eq!(d.get(&i), Some(&i));
        }
    }

    #[test]
    fn clear_dict() {
        let mut d: Dict<&str, &str> = Dict::with_hash_key(fixed_key());
        d.insert("k", "v");
        d.clear();
        assert_eq!(d.len(), 0);
        assert_eq!(d.get("k"), None);
    }

    #[test]
    fn clear_and_reuse() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        d.insert("a", 1);
        d.clear();
        assert_eq!(d.len(), 0);
        assert!(d.insert("a", 2));
        assert_eq!(d.get("a"), Some(&2));
    }

    #[test]
    fn iteration_work() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        d.insert("x", 1);
        d.insert("y", 2);
        d.insert("z", 3);

        let mut seen = vec![];
        for (k, v) in d.iter() {
            seen.push((*k, *v));
        }
        seen.sort();
        assert_eq!(seen, vec![("x", 1), ("y", 2), ("z", 3)]);
    }

    #[test]
    fn empty_iterator() {
        let d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        let mut iter = d.iter();
        assert_eq!(iter.next(), None);
    }

    /// Рехеширование ограничено бюджетом: `rehash(n)` переносит не более
    /// `n` непустых бакетов за вызов, остальная работа откладывается на
    /// следующий вызов.
    #[test]
    fn rehash_is_incremental_and_bounded() {
        let mut d: Dict<i32, i32> = Dict::with_hash_key(fixed_key());
        for i in 0..64 {
            d.insert(i, i);
        }
        // На этом этапе рехеширование уже может быть запущено или завершено
        // отдельными шагами внутри insert; убеждаемся, что принудительный
        // rehash(1) всегда либо продвигает, либо сообщает "рехеширования нет".
        let before = d.is_rehashing();
        let more = d.rehash(1);
        if before {
            assert!(more || !d.is_rehashing());
        } else {
            assert!(!more);
        }
        for i in 0..64 {
            assert_eq!(d.get(&i), Some(&i));
        }
    }

    #[test]
    fn random_entry_returns_present_key() {
        let mut d: Dict<&str, i32> = Dict::with_hash_key(fixed_key());
        assert!(d.random_entry().is_none());
        d.insert("only", 7);
        assert_eq!(d.random_entry(), Some((&"only", &7)));
    }
}
