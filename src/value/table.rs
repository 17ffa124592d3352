use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use super::Value;

/// Table key: integer slot or string field
///
/// Integer keys sort before string keys, so array slots always come first
/// when iterating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i.into())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Int(i as i64)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}

/// Ordered key/value container
///
/// Storing `Nil` removes the key, so an absent field and a nil field are the
/// same thing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: BTreeMap<Key, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`, or `Nil`
    pub fn get(&self, key: impl Into<Key>) -> &Value {
        self.entries.get(&key.into()).unwrap_or(&Value::Nil)
    }

    pub fn get_mut(&mut self, key: impl Into<Key>) -> Option<&mut Value> {
        self.entries.get_mut(&key.into())
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// Insert a value, returning the previous one. Inserting `Nil` removes.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Value {
        let key = key.into();
        let value = value.into();
        let previous = if value.is_nil() {
            self.entries.remove(&key)
        } else {
            self.entries.insert(key, value)
        };
        previous.unwrap_or_default()
    }

    pub fn remove(&mut self, key: impl Into<Key>) -> Value {
        self.entries.remove(&key.into()).unwrap_or_default()
    }

    /// Append at slot `len + 1`
    pub fn push(&mut self, value: impl Into<Value>) {
        let next = self.len() as i64 + 1;
        self.insert(Key::Int(next), value);
    }

    /// True iff the keys are exactly the integers `1..=N` (an empty table qualifies)
    pub fn is_array(&self) -> bool {
        self.entries
            .keys()
            .enumerate()
            .all(|(i, key)| *key == Key::Int(i as i64 + 1))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Key, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, Key, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> btree_map::Values<'_, Key, Value> {
        self.entries.values()
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

impl IntoIterator for Table {
    type Item = (Key, Value);
    type IntoIter = btree_map::IntoIter<Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a Key, &'a Value);
    type IntoIter = btree_map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            f.write_str("[")?;
            for (i, value) in self.values().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str("]")
        } else {
            f.write_str("{")?;
            for (i, (key, value)) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            f.write_str("}")
        }
    }
}
