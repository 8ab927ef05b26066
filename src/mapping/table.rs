use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// String-keyed map that remembers insertion order.
///
/// Re-inserting an existing key replaces its value in place, so enumeration
/// order is the order in which keys were first seen. Serializes as a JSON
/// object in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for MappingTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MappingTable<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or replaces; returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[slot].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl<V> FromIterator<(String, V)> for MappingTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

impl<V: Serialize> Serialize for MappingTable<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct TableVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for TableVisitor<V> {
    type Value = MappingTable<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object of mapping entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut table = MappingTable::with_capacity(access.size_hint().unwrap_or(0).min(1 << 16));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            table.insert(key, value);
        }
        Ok(table)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for MappingTable<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::MappingTable;

    #[test]
    fn reinsert_replaces_value_but_keeps_first_position() {
        let mut table = MappingTable::new();
        assert_eq!(table.insert("b".to_string(), 1), None);
        assert_eq!(table.insert("a".to_string(), 2), None);
        assert_eq!(table.insert("b".to_string(), 3), Some(1));

        let pairs: Vec<_> = table.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("b", 3), ("a", 2)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("b"), Some(&3));
        assert_eq!(table.get("c"), None);
    }

    #[test]
    fn json_object_order_survives_deserialize_and_serialize() {
        let raw = r#"{"z":1,"m":2,"a":3}"#;
        let table: MappingTable<u32> = serde_json::from_str(raw).unwrap();
        let keys: Vec<_> = table.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "m", "a"]);
        assert_eq!(serde_json::to_string(&table).unwrap(), raw);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        let err = serde_json::from_str::<MappingTable<u32>>("[1,2,3]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }
}
