//! In-memory blob store
//!
//! Keeps blobs in an ordered map. Clones share the same contents, so a test
//! can hand one clone to a service and inspect the raw keys through another.

use super::{BlobError, BlobResult, BlobStore, ListFn, PutOptions};
use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory blob store
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: Arc<RwLock<Entries>>,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the current contents, keyed by the raw stored key.
    pub fn snapshot(&self) -> Entries {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlobStore for MemStore {
    fn get(&self, key: &[u8]) -> BlobResult<Vec<u8>> {
        self.read().get(key).cloned().ok_or(BlobError::KeyNotFound)
    }

    fn put(&self, opts: PutOptions<'_>) -> BlobResult<()> {
        let mut entries = self.write();
        if !opts.replace && entries.contains_key(opts.key) {
            return Err(BlobError::KeyExists);
        }
        entries.insert(opts.key.to_vec(), opts.data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> BlobResult<()> {
        match self.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(BlobError::KeyNotFound),
        }
    }

    fn size(&self, key: &[u8]) -> BlobResult<u64> {
        self.read()
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or(BlobError::KeyNotFound)
    }

    fn list(&self, start: &[u8], f: &mut ListFn<'_>) -> BlobResult<()> {
        // Release the lock before calling back so f may use the store.
        let keys: Vec<Vec<u8>> = self
            .read()
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
            .map(|(key, _)| key.clone())
            .collect();

        for key in keys {
            if let ControlFlow::Break(()) = f(key.as_slice())? {
                break;
            }
        }
        Ok(())
    }

    fn len(&self) -> BlobResult<u64> {
        Ok(self.read().len() as u64)
    }
}
