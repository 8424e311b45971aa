use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use super::{Attributes, Record, RecordStore, StoreError};

const RECORDS_FILE: &str = "records.json";

/// Record store persisted as a JSON array under the data directory.
///
/// The whole file is rewritten through a temporary sibling and renamed into
/// place after every `put`, so a crash never leaves a half-written file. The
/// in-memory view only changes once the rename succeeds.
#[derive(Debug)]
pub struct FileRecordStore {
    path: Utf8PathBuf,
    records: Mutex<BTreeMap<String, Record>>,
}

impl FileRecordStore {
    /// Opens (or creates) the store inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or an existing
    /// records file cannot be read or decoded.
    pub fn open(directory: &Utf8Path) -> Result<Self, StoreError> {
        fs::create_dir_all(directory).map_err(|source| StoreError::Io {
            path: directory.to_owned(),
            source,
        })?;
        let path = directory.join(RECORDS_FILE);
        let records = load_records(&path)?;
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn persist(&self, records: &BTreeMap<String, Record>) -> Result<(), StoreError> {
        let rows: Vec<&Record> = records.values().collect();
        let payload = serde_json::to_vec_pretty(&rows).map_err(StoreError::Encode)?;
        atomic_write(&self.path, &payload).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn put(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError> {
        let record = Record::new(id, attributes);
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let mut next = records.clone();
        next.insert(id.to_owned(), record.clone());
        self.persist(&next)?;
        *records = next;
        Ok(record)
    }

    fn scan(&self) -> Result<Vec<Record>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.values().cloned().collect())
    }
}

fn load_records(path: &Utf8Path) -> Result<BTreeMap<String, Record>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };
    let rows: Vec<Record> = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
        path: path.to_owned(),
        source,
    })?;
    Ok(rows
        .into_iter()
        .map(|record| (record.id().to_owned(), record))
        .collect())
}

fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "records path did not have a parent directory",
        )
    })?;

    let mut file = Builder::new()
        .prefix(RECORDS_FILE)
        .tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn data_dir() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        (dir, path)
    }

    #[test]
    fn records_survive_reopen() {
        let (_guard, path) = data_dir();
        let store = FileRecordStore::open(&path).expect("open store");
        let attributes = Attributes::from([("web".to_owned(), "example.org".to_owned())]);
        store.put("r1", attributes).expect("put record");
        drop(store);

        let reopened = FileRecordStore::open(&path).expect("reopen store");
        let record = reopened.get("r1").expect("get").expect("record present");
        assert_eq!(record.get("web"), Some("example.org"));
        assert_eq!(record.get("id"), Some("r1"));
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let (_guard, path) = data_dir();
        fs::write(path.join(RECORDS_FILE), b"{not json").expect("write corrupt file");
        let error = FileRecordStore::open(&path).expect_err("corrupt file should fail");
        assert!(matches!(error, StoreError::Decode { .. }));
    }

    #[test]
    fn empty_directory_opens_empty_store() {
        let (_guard, path) = data_dir();
        let store = FileRecordStore::open(&path).expect("open store");
        assert!(store.scan().expect("scan").is_empty());
        assert!(!store.path().exists());
    }
}
