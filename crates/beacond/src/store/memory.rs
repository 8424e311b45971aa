use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{Attributes, Record, RecordStore, StoreError};

/// Record store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl MemoryRecordStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn put(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError> {
        let record = Record::new(id, attributes);
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(id.to_owned(), record.clone());
        Ok(record)
    }

    fn scan(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> MemoryRecordStore {
        MemoryRecordStore::new()
    }

    fn attributes(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[rstest]
    fn missing_record_reads_as_none(store: MemoryRecordStore) {
        assert_eq!(store.get("absent").expect("get"), None);
    }

    #[rstest]
    fn put_replaces_previous_attributes(store: MemoryRecordStore) {
        store
            .put("r1", attributes(&[("sede", "Norte"), ("cp", "1000")]))
            .expect("first put");
        store
            .put("r1", attributes(&[("sede", "Sur")]))
            .expect("second put");

        let record = store.get("r1").expect("get").expect("record present");
        assert_eq!(record.get("sede"), Some("Sur"));
        assert_eq!(record.get("cp"), None);
    }

    #[rstest]
    fn scan_returns_records_ordered_by_id(store: MemoryRecordStore) {
        store.put("b", Attributes::new()).expect("put b");
        store.put("a", Attributes::new()).expect("put a");
        let ids: Vec<_> = store
            .scan()
            .expect("scan")
            .iter()
            .map(|record| record.id().to_owned())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
