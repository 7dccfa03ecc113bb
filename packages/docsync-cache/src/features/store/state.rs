//! The two maps guarded by the store lock

use crate::shared::{CacheValue, EntryMetadata, EntrySnapshot};
use std::collections::HashMap;

/// Value map + metadata map, always mutated together under the store lock
#[derive(Debug, Default)]
pub struct StoreState {
    values: HashMap<String, CacheValue>,
    metadata: HashMap<String, EntryMetadata>,
    total_bytes: usize,
}

impl StoreState {
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&CacheValue> {
        self.values.get(key)
    }

    pub fn metadata(&self, key: &str) -> Option<&EntryMetadata> {
        self.metadata.get(key)
    }

    pub fn metadata_mut(&mut self, key: &str) -> Option<&mut EntryMetadata> {
        self.metadata.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &CacheValue, Option<&EntryMetadata>)> {
        self.values
            .iter()
            .map(move |(k, v)| (k, v, self.metadata.get(k)))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Write value and metadata as one unit
    pub fn insert(&mut self, key: &str, value: CacheValue, metadata: EntryMetadata) {
        self.put_value(key, value);
        self.metadata.insert(key.to_string(), metadata);
    }

    /// Write the value only; metadata is refreshed separately (transaction commit)
    pub fn put_value(&mut self, key: &str, value: CacheValue) -> Option<CacheValue> {
        self.total_bytes += value.size_bytes();
        let previous = self.values.insert(key.to_string(), value);
        if let Some(old) = &previous {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes());
        }
        previous
    }

    pub fn put_metadata(&mut self, key: &str, metadata: EntryMetadata) {
        self.metadata.insert(key.to_string(), metadata);
    }

    /// Remove value and metadata together
    pub fn remove(&mut self, key: &str) -> Option<EntrySnapshot> {
        let metadata = self.metadata.remove(key);
        let value = self.values.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(value.size_bytes());
        Some(EntrySnapshot { value, metadata })
    }

    pub fn snapshot(&self, key: &str) -> Option<EntrySnapshot> {
        self.values.get(key).map(|value| EntrySnapshot {
            value: value.clone(),
            metadata: self.metadata.get(key).cloned(),
        })
    }

    /// Put back an entry exactly as it was snapshotted
    pub fn restore(&mut self, key: &str, snapshot: EntrySnapshot) {
        self.put_value(key, snapshot.value);
        match snapshot.metadata {
            Some(metadata) => {
                self.metadata.insert(key.to_string(), metadata);
            }
            None => {
                self.metadata.remove(key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.metadata.clear();
        self.total_bytes = 0;
    }
}
