//! Адаптивное множество: начинает жизнь как `IntSet`, один раз и
//! необратимо повышается до хеш-таблицы (`Dict`), когда содержимое
//! больше не помещается в целочисленную кодировку.
//!
//! Апгрейд — это переход состояния "туда и обратно не бывает": как
//! только множество стало `Dict`, оно таким и остаётся, даже если позже
//! опустеет почти целиком.

use crate::database::{dict::Dict, intset::IntSet, siphash::SipHashKey};

/// Множество байт-строк с адаптивным внутренним представлением.
#[derive(Debug, Clone)]
pub enum SetValue {
    Int(IntSet),
    Hash(Dict<Vec<u8>, ()>),
}

impl SetValue {
    pub fn new() -> Self {
        SetValue::Int(IntSet::new())
    }

    /// `true`, если множество сейчас хранится как `IntSet`.
    pub fn is_int_encoded(&self) -> bool {
        matches!(self, SetValue::Int(_))
    }

    pub fn cardinality(&self) -> usize {
        match self {
            SetValue::Int(s) => s.len(),
            SetValue::Hash(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    pub fn contains(
        &self,
        member: &[u8],
    ) -> bool {
        match self {
            SetValue::Int(s) => match parse_i64(member) {
                Some(v) => s.contains(v),
                None => false,
            },
            SetValue::Hash(d) => d.contains_key(member),
        }
    }

    /// Добавляет элемент. `max_list_size` — порог кардинальности, выше
    /// которого `IntSet` форсированно повышается до `Dict` (см. §4.4).
    /// Возвращает `true`, если элемент был новым.
    pub fn add(
        &mut self,
        member: Vec<u8>,
        max_list_size: usize,
        hash_key: &SipHashKey,
    ) -> bool {
        match self {
            SetValue::Int(_) if parse_i64(&member).is_none() => {
                self.upgrade(hash_key);
                self.add(member, max_list_size, hash_key)
            }
            SetValue::Int(s) => {
                let v = parse_i64(&member).expect("checked above");
                let inserted = s.insert(v);
                if s.len() > max_list_size {
                    self.upgrade(hash_key);
                }
                inserted
            }
            SetValue::Hash(d) => d.insert(member, ()),
        }
    }

    pub fn remove(
        &mut self,
        member: &[u8],
    ) -> bool {
        match self {
            SetValue::Int(s) => match parse_i64(member) {
                Some(v) => s.remove(v),
                None => false,
            },
            SetValue::Hash(d) => d.remove(member),
        }
    }

    /// Материализует все члены множества как владеющие байтовые строки.
    /// Целые члены форматируются как десятичные ASCII-строки.
    pub fn members(&self) -> Vec<Vec<u8>> {
        match self {
            SetValue::Int(s) => s.iter().map(|v| v.to_string().into_bytes()).collect(),
            SetValue::Hash(d) => d.iter().map(|(k, _)| k.clone()).collect(),
        }
    }

    pub fn each<F: FnMut(&[u8])>(
        &self,
        mut f: F,
    ) {
        match self {
            SetValue::Int(s) => {
                for v in s.iter() {
                    f(v.to_string().as_bytes());
                }
            }
            SetValue::Hash(d) => {
                for (k, _) in d.iter() {
                    f(k);
                }
            }
        }
    }

    pub fn random_member(&self) -> Option<Vec<u8>> {
        match self {
            SetValue::Int(s) => s.random_member().map(|v| v.to_string().into_bytes()),
            SetValue::Hash(d) => d.random_entry().map(|(k, _)| k.clone()),
        }
    }

    /// Удаляет и возвращает один случайный элемент.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        match self {
            SetValue::Int(s) => s.pop().map(|v| v.to_string().into_bytes()),
            SetValue::Hash(d) => {
                let key = d.random_entry().map(|(k, _)| k.clone())?;
                d.remove(&key);
                Some(key)
            }
        }
    }

    /// Удаляет и возвращает до `count` случайных, различных членов
    /// (см. §4.4 "POP with count").
    pub fn pop_with_count(
        &mut self,
        count: usize,
    ) -> Vec<Vec<u8>> {
        let card = self.cardinality();
        if count >= card {
            let all = self.members();
            *self = SetValue::Int(IntSet::new());
            return all;
        }

        let remaining = card - count;
        if remaining.saturating_mul(5) > count {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                if let Some(m) = self.pop() {
                    out.push(m);
                } else {
                    break;
                }
            }
            return out;
        }

        // count относительно велик: переносим `remaining` случайно
        // выбранных членов в новый набор, который станет оставшимся
        // множеством; всё, что не перенесено, уходит вызывающей стороне.
        let mut kept = SetValue::Int(IntSet::new());
        let hash_key = SipHashKey::generate();
        for _ in 0..remaining {
            if let Some(m) = self.pop() {
                kept.add(m, usize::MAX, &hash_key);
            }
        }
        let popped = self.members();
        *self = kept;
        popped
    }

    /// Реализует "random members with count" (§4.4): `count < 0` —
    /// сэмплирование с повторами; `count >= 0` — различные члены.
    pub fn random_members_with_count(
        &self,
        count: i64,
    ) -> Vec<Vec<u8>> {
        if count == 0 {
            return Vec::new();
        }

        if count < 0 {
            let n = count.unsigned_abs() as usize;
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                if let Some(m) = self.random_member() {
                    out.push(m);
                }
            }
            return out;
        }

        let count = count as usize;
        let card = self.cardinality();
        if count >= card {
            return self.members();
        }

        if count.saturating_mul(3) > card {
            // count близко к кардинальности: копируем всё, затем случайно
            // удаляем лишнее.
            let mut working: Vec<Vec<u8>> = self.members();
            use rand::Rng;
            let mut rng = rand::thread_rng();
            while working.len() > count {
                let idx = rng.gen_range(0..working.len());
                working.swap_remove(idx);
            }
            return working;
        }

        // count мал относительно кардинальности: сэмплируем по одному,
        // пока не наберём `count` различных членов.
        use std::collections::HashSet;
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut out = Vec::with_capacity(count);
        while out.len() < count {
            let Some(m) = self.random_member() else {
                break;
            };
            if seen.insert(m.clone()) {
                out.push(m);
            }
        }
        out
    }

    /// Повышает `IntSet` до `Dict`, переформатировав каждый целочисленный
    /// член в его десятичное ASCII-представление. Нет-op для уже-`Dict`.
    fn upgrade(
        &mut self,
        hash_key: &SipHashKey,
    ) {
        if let SetValue::Int(s) = self {
            let mut d = Dict::with_hash_key(hash_key.clone());
            for v in s.iter() {
                d.insert(v.to_string().into_bytes(), ());
            }
            *self = SetValue::Hash(d);
        }
    }
}

impl Default for SetValue {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse::<i64>().ok()
}

/// Пересечение: сортирует входы по возрастанию кардинальности, обходит
/// наименьший, ранний выход при первом промахе (§4.4).
pub fn intersect(sets: &[&SetValue]) -> SetValue {
    if sets.is_empty() {
        return SetValue::new();
    }

    let mut order: Vec<&&SetValue> = sets.iter().collect();
    order.sort_by_key(|s| s.cardinality());

    let mut result = SetValue::new();
    let hash_key = SipHashKey::generate();
    let smallest = order[0];
    let rest = &order[1..];

    smallest.each(|m| {
        if rest.iter().all(|s| s.contains(m)) {
            result.add(m.to_vec(), usize::MAX, &hash_key);
        }
    });

    result
}

/// Объединение: накапливает все члены в свежее множество (§4.4).
pub fn union(sets: &[&SetValue]) -> SetValue {
    let mut result = SetValue::new();
    let hash_key = SipHashKey::generate();
    for s in sets {
        s.each(|m| {
            result.add(m.to_vec(), usize::MAX, &hash_key);
        });
    }
    result
}

/// Разность `sets[0] - sets[1] - ... - sets[n-1]` (§4.4). Выбирает один
/// из двух алгоритмов по оценённому объёму работы.
pub fn difference(sets: &[&SetValue]) -> SetValue {
    let Some((first, others)) = sets.split_first() else {
        return SetValue::new();
    };

    if others.is_empty() {
        let mut result = SetValue::new();
        let hash_key = SipHashKey::generate();
        first.each(|m| {
            result.add(m.to_vec(), usize::MAX, &hash_key);
        });
        return result;
    }

    let work1: usize = others.iter().map(|s| first.cardinality()).sum();
    let work2: usize = others.iter().map(|s| s.cardinality()).sum();

    let hash_key = SipHashKey::generate();

    if work1 / 2 <= work2 {
        // Алгоритм 1: большие множества сначала — больше шансов
        // дисквалифицировать элемент раньше.
        let mut ordered: Vec<&&SetValue> = others.iter().collect();
        ordered.sort_by_key(|s| std::cmp::Reverse(s.cardinality()));

        let mut result = SetValue::new();
        first.each(|m| {
            if !ordered.iter().any(|s| s.contains(m)) {
                result.add(m.to_vec(), usize::MAX, &hash_key);
            }
        });
        result
    } else {
        // Алгоритм 2: копируем первое множество, удаляем найденные в
        // остальных.
        let mut result = SetValue::new();
        first.each(|m| {
            result.add(m.to_vec(), usize::MAX, &hash_key);
        });
        for s in others {
            s.each(|m| {
                result.remove(m);
            });
        }
        result
    }
}
