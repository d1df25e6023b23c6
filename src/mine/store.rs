use crate::model::{MethodKey, MetricRecord};
use std::collections::{BTreeSet, HashMap};

/// Open method histories, keyed by their current identity.
///
/// Every key present holds at least one record, in the order the records were
/// appended. A secondary index by path keeps closure and rename lookups from
/// scanning every open key.
#[derive(Debug, Default)]
pub struct MetricStore {
    entries: HashMap<MethodKey, Vec<MetricRecord>>,
    by_path: HashMap<String, BTreeSet<String>>,
    records: usize,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: MethodKey, record: MetricRecord) {
        self.records += 1;
        match self.entries.get_mut(&key) {
            Some(list) => list.push(record),
            None => {
                self.index(&key);
                self.entries.insert(key, vec![record]);
            }
        }
    }

    pub fn contains(&self, key: &MethodKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &MethodKey) -> Option<&[MetricRecord]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn extract_and_remove(&mut self, key: &MethodKey) -> Option<Vec<MetricRecord>> {
        let list = self.entries.remove(key)?;
        self.unindex(key);
        self.records -= list.len();
        Some(list)
    }

    /// Installs a whole history under `key`; the key must not be open.
    pub(crate) fn insert_list(&mut self, key: MethodKey, list: Vec<MetricRecord>) {
        debug_assert!(!list.is_empty());
        debug_assert!(!self.entries.contains_key(&key));
        self.records += list.len();
        self.index(&key);
        self.entries.insert(key, list);
    }

    /// Open keys living in `path`, oldest-opened first.
    pub fn keys_on_path(&self, path: &str) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self
            .by_path
            .get(path)
            .map(|methods| methods.iter().map(|m| MethodKey::new(path, m.as_str())).collect())
            .unwrap_or_default();
        keys.sort_by_key(|k| self.first_sequence(k));
        keys
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Drains every open history, oldest-opened first.
    pub fn remaining(&mut self) -> Vec<(MethodKey, Vec<MetricRecord>)> {
        self.by_path.clear();
        self.records = 0;
        let mut all: Vec<_> = self.entries.drain().collect();
        all.sort_by_key(|(_, list)| list.first().map(|r| r.sequence).unwrap_or(u64::MAX));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    fn first_sequence(&self, key: &MethodKey) -> u64 {
        self.entries
            .get(key)
            .and_then(|list| list.first())
            .map(|r| r.sequence)
            .unwrap_or(u64::MAX)
    }

    fn index(&mut self, key: &MethodKey) {
        self.by_path
            .entry(key.path().to_string())
            .or_default()
            .insert(key.method().to_string());
    }

    fn unindex(&mut self, key: &MethodKey) {
        if let Some(methods) = self.by_path.get_mut(key.path()) {
            methods.remove(key.method());
            if methods.is_empty() {
                self.by_path.remove(key.path());
            }
        }
    }
}
