//! a `Store` adapted to local filesystem

use super::{Store, StoreValue};
use crate::protocol::error::Result;
use serde_json::json;
use std::io::{Error as IOError, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// contains path and json to the document
/// # Example
/// ```
/// use custody::store::disk::DiskStore;
/// let store = DiskStore::new(std::env::temp_dir().join("custody-doc-alice"), "test");
/// assert!(store.is_ok());
/// ```
pub struct DiskStore {
    path: PathBuf,
    store: serde_json::Value,
    modified: bool,
}

impl DiskStore {
    pub fn new(path: impl AsRef<Path>, docname: &str) -> Result<DiskStore> {
        let mut path = path.as_ref().to_path_buf();
        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }
        path.push(docname);
        let store: serde_json::Value = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            json!({})
        };
        Ok(DiskStore {
            path,
            store,
            modified: false,
        })
    }

    /// writes pending changes to disk
    pub fn flush(&mut self) -> Result<()> {
        if self.modified {
            serde_json::to_writer(std::fs::File::create(&self.path)?, &self.store)?;
            self.modified = false;
            debug!("flushed store to {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for DiskStore {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            error!("losing unflushed store {}: {}", self.path.display(), err);
        }
    }
}

impl Store for DiskStore {
    fn get<T: StoreValue>(&self, key: &str) -> Result<T> {
        match self.store.get(key) {
            Some(value) => {
                let bytes = serde_json::from_value::<Vec<u8>>(value.to_owned())?;
                T::from_bytes(bytes.as_slice()).map_err(|_| {
                    error!("stored value under {} has the wrong shape", key);
                    IOError::new(ErrorKind::InvalidData, "Cannot convert to StoreValue").into()
                })
            }
            None => Err(IOError::new(ErrorKind::NotFound, "key not found").into()),
        }
    }

    fn set(&mut self, key: &str, value: &impl StoreValue) -> Result<()> {
        self.store[key] = serde_json::to_value(value.clone().to_bytes())?;
        self.modified = true;
        Ok(())
    }
}

#[test]
fn test_persists_across_instances() {
    use crate::math::Uint;
    use crate::protocol::error::Error;

    let dir = std::env::temp_dir().join(format!("custody-store-{}", std::process::id()));
    let values = vec![Uint::from_u64(7), Uint::MAX];
    {
        let mut store = DiskStore::new(&dir, "persist").unwrap();
        store.set("values", &values).unwrap();
        store.set("count", &3u64).unwrap();
    }
    let store = DiskStore::new(&dir, "persist").unwrap();
    assert_eq!(store.get::<Vec<Uint>>("values").unwrap(), values);
    assert_eq!(store.get::<u64>("count").unwrap(), 3);
    assert_eq!(
        store.get::<u64>("absent"),
        Err(Error::IOError(ErrorKind::NotFound))
    );
    assert_eq!(
        store.get::<u32>("count"),
        Err(Error::IOError(ErrorKind::InvalidData))
    );
    std::fs::remove_dir_all(&dir).unwrap();
}
