//! Values produced by composite literal recipes.
//!
//! Lists resolve to a plain `Vec<Bean>`. Sets and maps need a notion of
//! equality over type-erased beans: primitive values compare by type and
//! value, every other object by identity (see [`BeanKey`]).

use std::collections::HashMap;

use ahash::RandomState;
use indexmap::IndexMap;

use crate::bean::{downcast, identity, Bean};
use crate::key::TypeKey;

/// Equality key of a bean inside a set or map literal.
///
/// Numbers keep their type, so `5i32` and `5i64` are distinct elements.
/// `String` and `&'static str` share one text key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BeanKey {
    Bool(bool),
    Int(TypeKey, i128),
    Float(TypeKey, u64),
    Char(char),
    Str(String),
    Identity(usize),
}

macro_rules! int_key {
    ($bean:expr, $($ty:ty),*) => {
        $(
            if let Some(v) = downcast::<$ty>($bean) {
                return BeanKey::Int(TypeKey::of::<$ty>(), *v as i128);
            }
        )*
    };
}

impl BeanKey {
    pub fn of(bean: &Bean) -> Self {
        int_key!(bean, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
        if let Some(v) = downcast::<bool>(bean) {
            return BeanKey::Bool(*v);
        }
        if let Some(v) = downcast::<char>(bean) {
            return BeanKey::Char(*v);
        }
        if let Some(v) = downcast::<String>(bean) {
            return BeanKey::Str((*v).clone());
        }
        if let Some(v) = downcast::<&'static str>(bean) {
            return BeanKey::Str((*v).to_string());
        }
        if let Some(v) = downcast::<f64>(bean) {
            return BeanKey::Float(TypeKey::of::<f64>(), v.to_bits());
        }
        if let Some(v) = downcast::<f32>(bean) {
            return BeanKey::Float(TypeKey::of::<f32>(), (*v as f64).to_bits());
        }
        BeanKey::Identity(identity(bean))
    }
}

impl From<&str> for BeanKey {
    fn from(value: &str) -> Self {
        BeanKey::Str(value.to_string())
    }
}

macro_rules! int_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BeanKey {
                fn from(value: $ty) -> Self {
                    BeanKey::Int(TypeKey::of::<$ty>(), value as i128)
                }
            }
        )*
    };
}

int_from!(i32, i64, u32, u64, usize);

enum Entries<V> {
    Hashed(HashMap<BeanKey, V, RandomState>),
    Ordered(IndexMap<BeanKey, V>),
}

impl<V> Entries<V> {
    fn new(ordered: bool, capacity: usize) -> Self {
        if ordered {
            Entries::Ordered(IndexMap::with_capacity(capacity))
        } else {
            Entries::Hashed(HashMap::with_capacity_and_hasher(capacity, RandomState::new()))
        }
    }

    /// Inserts unless the key is present; the first occurrence wins.
    fn insert_first(&mut self, key: BeanKey, value: V) {
        match self {
            Entries::Hashed(map) => {
                map.entry(key).or_insert(value);
            }
            Entries::Ordered(map) => {
                map.entry(key).or_insert(value);
            }
        }
    }

    /// Inserts, replacing the value of an existing key in place.
    fn insert_last(&mut self, key: BeanKey, value: V) {
        match self {
            Entries::Hashed(map) => {
                map.insert(key, value);
            }
            Entries::Ordered(map) => {
                map.insert(key, value);
            }
        }
    }

    fn get(&self, key: &BeanKey) -> Option<&V> {
        match self {
            Entries::Hashed(map) => map.get(key),
            Entries::Ordered(map) => map.get(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Entries::Hashed(map) => map.len(),
            Entries::Ordered(map) => map.len(),
        }
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        match self {
            Entries::Hashed(map) => Box::new(map.values()),
            Entries::Ordered(map) => Box::new(map.values()),
        }
    }
}

/// Set of beans without duplicates.
///
/// The ordered flavor iterates in insertion order.
pub struct BeanSet {
    entries: Entries<Bean>,
    ordered: bool,
}

impl BeanSet {
    pub fn new(ordered: bool) -> Self {
        Self::with_capacity(ordered, 0)
    }

    pub fn with_capacity(ordered: bool, capacity: usize) -> Self {
        BeanSet {
            entries: Entries::new(ordered, capacity),
            ordered,
        }
    }

    /// Adds a bean; returns `false` if an equal bean was already present.
    pub fn insert(&mut self, bean: Bean) -> bool {
        let key = BeanKey::of(&bean);
        if self.entries.get(&key).is_some() {
            return false;
        }
        self.entries.insert_first(key, bean);
        true
    }

    pub fn contains(&self, bean: &Bean) -> bool {
        self.entries.get(&BeanKey::of(bean)).is_some()
    }

    pub fn contains_key(&self, key: &BeanKey) -> bool {
        self.entries.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bean> + '_ {
        self.entries.values()
    }
}

/// Mapping from key beans to value beans.
///
/// The ordered flavor iterates in insertion order. A repeated key keeps its
/// original position and takes the later value.
pub struct BeanMap {
    entries: Entries<(Bean, Bean)>,
    ordered: bool,
}

impl BeanMap {
    pub fn new(ordered: bool) -> Self {
        Self::with_capacity(ordered, 0)
    }

    pub fn with_capacity(ordered: bool, capacity: usize) -> Self {
        BeanMap {
            entries: Entries::new(ordered, capacity),
            ordered,
        }
    }

    pub fn insert(&mut self, key: Bean, value: Bean) {
        self.entries.insert_last(BeanKey::of(&key), (key, value));
    }

    pub fn get(&self, key: &BeanKey) -> Option<&Bean> {
        self.entries.get(key).map(|(_, v)| v)
    }

    /// Convenience lookup for string keys.
    pub fn get_str(&self, key: &str) -> Option<&Bean> {
        self.get(&BeanKey::from(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bean, &Bean)> + '_ {
        self.entries.values().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Bean> + '_ {
        self.iter().map(|(k, _)| k)
    }
}
